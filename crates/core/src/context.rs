//! Per-request site context.
//!
//! The front end tells us which surface the request came from. Only the
//! site name changes the system instruction; the other attributes are
//! carried along for prompt details (e.g. the story a chat is about).

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// The site name that selects the dedicated garden-helper instruction.
pub const MEMORY_GARDEN_SITE: &str = "Memory Garden";

/// Optional attribute bag describing where a request came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteContext {
    /// Site name; the front end historically sends this as `website_name`.
    #[serde(default, alias = "website_name", skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,

    /// Free-form key/value pairs.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl SiteContext {
    pub fn for_site(name: impl Into<String>) -> Self {
        Self {
            site_name: Some(name.into()),
            attributes: serde_json::Map::new(),
        }
    }

    /// Whether this is the Memory Garden site itself.
    pub fn is_memory_garden(&self) -> bool {
        self.site_name.as_deref() == Some(MEMORY_GARDEN_SITE)
    }

    /// A string attribute, if present and non-empty.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Add an attribute (builder style).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Parse a caller-supplied context document. `""` and `"null"` mean none.
    pub fn parse(raw: &str) -> Result<Option<Self>, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(None);
        }
        let value: serde_json::Value =
            serde_json::from_str(trimmed).map_err(|e| InputError::InvalidContext(e.to_string()))?;
        if !value.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }
}
