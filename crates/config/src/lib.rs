//! Configuration loading, validation, and management for Memory Garden.
//!
//! Application settings load from `~/.memgarden/config.toml` with
//! environment variable overrides. The personality document (tone and
//! canned responses) is a separate JSON file, see [`personality`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub mod merge;
pub mod personality;

pub use merge::merge;
pub use personality::{BUILTIN_FALLBACK, ConversationFlow, PersonalityConfig, PersonalityStore};

/// The root configuration structure.
///
/// Maps directly to `~/.memgarden/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text provider used when the caller does not pick one
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model override for the default text provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Image provider used when the caller does not pick one
    #[serde(default = "default_image_provider")]
    pub default_image_provider: String,

    /// Sampling temperature for text replies
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per text reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for one text oracle call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for one image oracle call
    #[serde(default = "default_image_timeout")]
    pub image_timeout_secs: u64,

    /// Path of the personality JSON document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality_file: Option<PathBuf>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "google".into()
}
fn default_image_provider() -> String {
    "hybrid".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    150
}
fn default_request_timeout() -> u64 {
    30
}
fn default_image_timeout() -> u64 {
    60
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_image_provider", &self.default_image_provider)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("personality_file", &self.personality_file)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Environment variables that carry vendor API keys, by provider name.
pub const API_KEY_ENV_VARS: &[(&str, &str)] = &[
    ("google", "GOOGLE_AI_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("huggingface", "HUGGINGFACE_API_KEY"),
    ("getimg", "GETIMG_API_KEY"),
];

impl AppConfig {
    /// Load configuration from the default path (~/.memgarden/config.toml).
    ///
    /// Environment overrides:
    /// - `GOOGLE_AI_API_KEY`, `OPENAI_API_KEY`, `HUGGINGFACE_API_KEY`,
    ///   `GETIMG_API_KEY` fill in keys the file does not set
    /// - `MEMGARDEN_PROVIDER`, `MEMGARDEN_MODEL`, `MEMGARDEN_PERSONALITY_FILE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for (provider, var) in API_KEY_ENV_VARS {
            let entry = self.providers.entry((*provider).to_string()).or_default();
            if entry.api_key.is_none() {
                entry.api_key = lookup(var).filter(|k| !k.is_empty());
            }
        }

        if let Some(provider) = lookup("MEMGARDEN_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("MEMGARDEN_MODEL") {
            self.default_model = Some(model);
        }

        if let Some(path) = lookup("MEMGARDEN_PERSONALITY_FILE") {
            self.personality_file = Some(PathBuf::from(path));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".memgarden")
    }

    /// Where the personality document lives.
    pub fn personality_path(&self) -> PathBuf {
        self.personality_file
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("ai_config.json"))
    }

    /// Settings for one provider, if present.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    /// API key for a provider, if one is configured.
    pub fn api_key(&self, name: &str) -> Option<&str> {
        self.provider(name)
            .and_then(|p| p.api_key.as_deref())
            .filter(|k| !k.is_empty())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.request_timeout_secs == 0 || self.image_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            default_model: None,
            default_image_provider: default_image_provider(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            image_timeout_secs: default_image_timeout(),
            personality_file: None,
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Invalid personality configuration: {0}")]
    InvalidPersonality(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "google");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.image_timeout_secs, config.image_timeout_secs);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = AppConfig {
            request_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_image_provider, "hybrid");
    }

    #[test]
    fn provider_sections_parse() {
        let toml_str = r#"
default_provider = "lmstudio"

[providers.lmstudio]
api_url = "http://localhost:4321/v1"
default_model = "deepseek-r1"

[providers.openai]
api_key = "sk-test"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_provider, "lmstudio");
        assert_eq!(
            config.provider("lmstudio").unwrap().api_url.as_deref(),
            Some("http://localhost:4321/v1")
        );
        assert_eq!(config.api_key("openai"), Some("sk-test"));
    }

    #[test]
    fn env_fills_missing_keys_only() {
        let mut config: AppConfig = toml::from_str(
            r#"
[providers.openai]
api_key = "from-file"
"#,
        )
        .unwrap();

        config.apply_env(|key| match key {
            "OPENAI_API_KEY" => Some("from-env".into()),
            "GOOGLE_AI_API_KEY" => Some("g-key".into()),
            "MEMGARDEN_PROVIDER" => Some("openai".into()),
            _ => None,
        });

        assert_eq!(config.api_key("openai"), Some("from-file"));
        assert_eq!(config.api_key("google"), Some("g-key"));
        assert_eq!(config.api_key("getimg"), None);
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == "GETIMG_API_KEY").then(|| "secret-value".to_string()));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn personality_path_defaults_under_config_dir() {
        let config = AppConfig::default();
        assert!(config.personality_path().ends_with("ai_config.json"));
    }
}
