//! Recursive merge of partial JSON updates.

use serde_json::{Map, Value};

/// Merge `updates` into `base` in place and return `base`.
///
/// Nested objects present on both sides are merged recursively; any other
/// value in `updates` replaces the one in `base`, including a change of
/// type. Keys only present in `base` are left alone.
pub fn merge<'a>(base: &'a mut Map<String, Value>, updates: &Map<String, Value>) -> &'a mut Map<String, Value> {
    for (key, value) in updates {
        if let (Some(Value::Object(existing)), Value::Object(nested)) = (base.get_mut(key), value) {
            merge(existing, nested);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
    base
}
