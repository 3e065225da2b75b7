//! The JSON envelope written to stdout.
//!
//! Every invocation prints exactly one object (`success`, payload fields,
//! `timestamp`), except `stream`, which prints one event per line.

use serde::Serialize;
use serde_json::{Map, Value, json};

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Wrap `payload` fields in a success envelope.
pub fn success(payload: Value) -> Value {
    let mut envelope = match payload {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    envelope.insert("success".into(), Value::Bool(true));
    envelope.insert("timestamp".into(), Value::String(timestamp()));
    Value::Object(envelope)
}

pub fn failure(error: impl std::fmt::Display) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "timestamp": timestamp(),
    })
}

/// Print one envelope.
pub fn emit(value: &Value) {
    println!("{value}");
}

/// Print one event as a single line.
pub fn emit_line<T: Serialize>(event: &T) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!(error = %e, "Failed to encode event"),
    }
}
