//! Personality settings: tone, canned responses and enabled techniques.
//!
//! Persisted as a free-form JSON document (`ai_config.json`). Nothing about
//! its shape is validated: readers go through accessors that fall back to
//! defaults when a key is missing or has an unexpected type.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::ConfigError;
use crate::merge::merge;

/// Returned by [`PersonalityConfig::get_custom_response`] when even the
/// `fallback` response is missing.
pub const BUILTIN_FALLBACK: &str = "I hear you. 💚";

/// Default reply ceiling in words when `conversation_flow` omits one.
const DEFAULT_MAX_RESPONSE_LENGTH: u64 = 200;

/// The mutable personality document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonalityConfig {
    values: Map<String, Value>,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        match default_document() {
            Value::Object(values) => Self { values },
            _ => Self { values: Map::new() },
        }
    }
}

fn default_document() -> Value {
    json!({
        "personality": {
            "role": "compassionate_therapist",
            "tone": "warm_and_empathetic",
            "style": "gentle_and_supportive",
            "approach": "listening_and_reflecting"
        },
        "responses": {
            "greeting": "I'm here to listen and support you. What's on your heart today? 💚",
            "fallback": "I hear you. Take your time - I'm here with you. 💚",
            "encouragement": "You're doing great. Keep sharing what feels right for you.",
            "reflection": "That sounds like it's bringing up some real feelings for you.",
            "closing": "Thank you for sharing with me. I'm here whenever you need to talk."
        },
        "therapeutic_techniques": {
            "active_listening": true,
            "reflective_responses": true,
            "emotional_validation": true,
            "gentle_questioning": true,
            "mindfulness_prompts": true
        },
        "conversation_flow": {
            "max_response_length": DEFAULT_MAX_RESPONSE_LENGTH,
            "use_emojis": true,
            "ask_follow_up_questions": true,
            "acknowledge_emotions": true,
            "provide_safe_space": true
        },
        "custom_prompts": {
            "memory_sharing": "Tell me more about this memory. What makes it special to you?",
            "emotional_exploration": "What feelings come up when you think about this?",
            "support_offering": "How can I best support you right now?",
            "reflection_request": "Would you like to explore this further?"
        }
    })
}

/// Typed view over the `conversation_flow` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationFlow {
    pub max_response_length: u64,
    pub use_emojis: bool,
    pub ask_follow_up_questions: bool,
}

impl PersonalityConfig {
    /// Build from an arbitrary JSON value; only objects are accepted.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(ConfigError::InvalidPersonality(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidPersonality(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Pretty JSON export.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| "{}".into())
    }

    fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.values.get(name).and_then(Value::as_object)
    }

    /// A configured response, without any fallback.
    pub fn response(&self, key: &str) -> Option<&str> {
        self.section("responses")?.get(key)?.as_str()
    }

    /// A configured response, falling back to `fallback`, then to
    /// [`BUILTIN_FALLBACK`].
    pub fn get_custom_response(&self, key: &str) -> String {
        self.response(key)
            .or_else(|| self.response("fallback"))
            .unwrap_or(BUILTIN_FALLBACK)
            .to_string()
    }

    /// A configured conversation-starter prompt.
    pub fn custom_prompt(&self, key: &str) -> Option<&str> {
        self.section("custom_prompts")?.get(key)?.as_str()
    }

    /// Techniques flagged `true`, in key order.
    pub fn enabled_techniques(&self) -> Vec<&str> {
        self.section("therapeutic_techniques")
            .map(|techniques| {
                techniques
                    .iter()
                    .filter(|(_, enabled)| enabled.as_bool() == Some(true))
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn conversation_flow(&self) -> ConversationFlow {
        let flow = self.section("conversation_flow");
        let flag = |key: &str| {
            flow.and_then(|f| f.get(key))
                .and_then(Value::as_bool)
                .unwrap_or(true)
        };
        ConversationFlow {
            max_response_length: flow
                .and_then(|f| f.get("max_response_length"))
                .and_then(Value::as_u64)
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_RESPONSE_LENGTH),
            use_emojis: flag("use_emojis"),
            ask_follow_up_questions: flag("ask_follow_up_questions"),
        }
    }

    /// Persona description rendered into the system instruction.
    pub fn personality_prompt(&self) -> String {
        let persona = self.section("personality");
        let trait_of = |key: &str, default: &str| {
            humanize(
                persona
                    .and_then(|p| p.get(key))
                    .and_then(Value::as_str)
                    .unwrap_or(default),
            )
        };

        let mut prompt = format!(
            "You are a {} with a {} tone.\n\nYour approach is {} and your style is {}.",
            trait_of("role", "compassionate_therapist"),
            trait_of("tone", "warm_and_empathetic"),
            trait_of("approach", "listening_and_reflecting"),
            trait_of("style", "gentle_and_supportive"),
        );

        let techniques = self.enabled_techniques();
        if !techniques.is_empty() {
            prompt.push_str("\n\nTechniques you use:\n");
            for technique in techniques {
                prompt.push_str(&format!("- {}\n", title_case(technique)));
            }
        }

        prompt
    }

    /// Apply a partial update (see [`merge`]).
    pub fn merge(&mut self, updates: &Map<String, Value>) -> &mut Self {
        merge(&mut self.values, updates);
        self
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn humanize(key: &str) -> String {
    key.replace('_', " ")
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads and writes the personality document on disk.
#[derive(Debug, Clone)]
pub struct PersonalityStore {
    path: PathBuf,
}

impl PersonalityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. Never fails: a missing, unreadable or invalid
    /// file yields the defaults.
    pub fn load(&self) -> PersonalityConfig {
        match self.load_existing() {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unusable personality file, using defaults");
                PersonalityConfig::default()
            }
        }
    }

    /// Load the document for editing. A missing file yields the defaults;
    /// a file that exists but cannot be read or parsed is an error, so
    /// callers never overwrite it with defaults.
    pub fn load_existing(&self) -> Result<PersonalityConfig, ConfigError> {
        if !self.path.exists() {
            info!("No personality file at {}, using defaults", self.path.display());
            return Ok(PersonalityConfig::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadError {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        PersonalityConfig::from_json(&content).map_err(|e| ConfigError::ParseError {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Write the document as pretty JSON, creating parent directories.
    pub fn save(&self, config: &PersonalityConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        std::fs::write(&self.path, config.to_json_pretty()).map_err(|e| self.write_error(e))
    }

    /// Merge `updates` into `config` and persist the result.
    pub fn update(
        &self,
        config: &mut PersonalityConfig,
        updates: &Map<String, Value>,
    ) -> Result<(), ConfigError> {
        config.merge(updates);
        self.save(config)
    }

    /// Overwrite the stored document with the defaults.
    pub fn reset(&self) -> Result<PersonalityConfig, ConfigError> {
        let config = PersonalityConfig::default();
        self.save(&config)?;
        Ok(config)
    }

    /// Replace the stored document with `json`.
    pub fn import(&self, json: &str) -> Result<PersonalityConfig, ConfigError> {
        let config = PersonalityConfig::from_json(json)?;
        self.save(&config)?;
        Ok(config)
    }

    fn write_error(&self, e: std::io::Error) -> ConfigError {
        ConfigError::WriteError {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}
