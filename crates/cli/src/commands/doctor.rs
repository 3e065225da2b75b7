//! `memgarden doctor`: diagnose configuration and provider health.

use std::time::Duration;

use memgarden_config::{API_KEY_ENV_VARS, AppConfig};
use memgarden_providers::router::build_from_config;

use super::personality_store;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Memory Garden Doctor");
    println!("=======================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    let config = match AppConfig::load() {
        Ok(config) => {
            if config_path.exists() {
                println!("  ✅ Config file valid");
            } else {
                println!("  ⚠️  No config file at {}, using defaults", config_path.display());
            }
            config
        }
        Err(e) => {
            println!("  ❌ Config file invalid: {e}");
            issues += 1;
            super::load_config()
        }
    };

    let store = personality_store(&config);
    if store.path().exists() {
        println!("  ✅ Personality document at {}", store.path().display());
    } else {
        println!("  ⚠️  No personality document, built-in defaults in use");
    }

    for (provider, var) in API_KEY_ENV_VARS {
        if config.api_key(provider).is_some() {
            println!("  ✅ {provider} API key configured");
        } else {
            println!("  ⚠️  No {provider} API key (set {var})");
        }
    }

    let router = build_from_config(&config);
    match router.default() {
        Some(provider) => {
            match tokio::time::timeout(HEALTH_TIMEOUT, provider.health_check()).await {
                Ok(Ok(true)) => println!("  ✅ Default provider '{}' reachable", provider.name()),
                Ok(Ok(false)) => {
                    println!("  ❌ Default provider '{}' unhealthy, chat will use fallback replies", provider.name());
                    issues += 1;
                }
                Ok(Err(e)) => {
                    println!("  ❌ Default provider '{}' failed: {e}", provider.name());
                    issues += 1;
                }
                Err(_) => {
                    println!("  ❌ Default provider '{}' did not answer within {}s", provider.name(), HEALTH_TIMEOUT.as_secs());
                    issues += 1;
                }
            }
        }
        None => {
            println!("  ❌ Unknown default provider '{}'", config.default_provider);
            issues += 1;
        }
    }

    if router.default_image().is_none() {
        println!("  ❌ Unknown default image provider '{}'", config.default_image_provider);
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
