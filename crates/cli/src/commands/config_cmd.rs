//! `memgarden config`: configuration management commands.

use std::path::Path;

use memgarden_config::{AppConfig, PersonalityConfig, PersonalityStore};
use serde_json::Value;

use super::{load_config, personality_store};

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let mut redacted = config.clone();
    for provider in redacted.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some("[REDACTED]".into());
        }
    }

    println!("{}", toml::to_string_pretty(&redacted)?);
    println!("# personality ({})", config.personality_path().display());
    println!("{}", personality_store(&config).load().to_json_pretty());
    Ok(())
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();
    println!("{}", AppConfig::config_dir().join("config.toml").display());
    println!("{}", config.personality_path().display());
    Ok(())
}

/// Write the personality document to `file`, or stdout.
pub fn export(file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let personality = personality_store(&load_config()).load();
    match file {
        Some(file) => {
            std::fs::write(file, personality.to_json_pretty())?;
            eprintln!("Exported personality to {}", file.display());
        }
        None => println!("{}", personality.to_json_pretty()),
    }
    Ok(())
}

pub fn import(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(file)?;
    let store = personality_store(&load_config());
    store.import(&json)?;
    eprintln!("Imported personality into {}", store.path().display());
    Ok(())
}

/// Deep-merge a JSON object into the stored personality.
pub fn update(json: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = personality_store(&load_config());
    let personality = apply_update(&store, json)?;
    println!("{}", personality.to_json_pretty());
    Ok(())
}

/// Merge `json` into the stored document. A stored document that fails to
/// parse is left untouched.
fn apply_update(store: &PersonalityStore, json: &str) -> Result<PersonalityConfig, Box<dyn std::error::Error>> {
    let updates = parse_updates(json)?;
    let mut personality = store
        .load_existing()
        .map_err(|e| format!("{e}; fix or reset the personality file before updating"))?;
    store.update(&mut personality, &updates)?;
    Ok(personality)
}

pub fn reset() -> Result<(), Box<dyn std::error::Error>> {
    let store = personality_store(&load_config());
    store.reset()?;
    eprintln!("Reset personality at {}", store.path().display());
    Ok(())
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ config.toml parsed successfully");
            config
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };

    let mut warnings = Vec::new();
    if config.api_key(&config.default_provider).is_none()
        && !matches!(config.default_provider.as_str(), "lmstudio" | "ollama")
    {
        warnings.push(format!(
            "No API key for default provider '{}'; chat will use fallback replies",
            config.default_provider
        ));
    }

    let store = personality_store(&config);
    if store.path().exists() {
        let raw = std::fs::read_to_string(store.path())?;
        match PersonalityConfig::from_json(&raw) {
            Ok(_) => println!("   ✅ Personality document parsed successfully"),
            Err(e) => warnings.push(format!("{e}; defaults will be used")),
        }
    } else {
        warnings.push(format!(
            "No personality document at {}; defaults will be used",
            store.path().display()
        ));
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Provider:  {}", config.default_provider);
    println!("   Model:     {}", config.default_model.as_deref().unwrap_or("(provider default)"));
    println!("   Images:    {}", config.default_image_provider);
    println!("   Timeouts:  {}s text, {}s image", config.request_timeout_secs, config.image_timeout_secs);

    Ok(())
}

fn parse_updates(json: &str) -> Result<serde_json::Map<String, Value>, Box<dyn std::error::Error>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        _ => Err("Updates must be a JSON object".into()),
    }
}
