pub mod analyze;
pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod image;
pub mod providers;
pub mod stream;

use std::time::Duration;

use memgarden_companion::CompanionService;
use memgarden_config::{AppConfig, PersonalityConfig, PersonalityStore};
use memgarden_providers::ProviderRouter;
use memgarden_providers::router::{DEFAULT_MEDIA_ANALYZER, build_from_config};
use tracing::warn;

/// Global flags that override config for one invocation.
#[derive(Debug, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Load config, degrading to defaults when it cannot be read.
pub fn load_config() -> AppConfig {
    match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Config unusable, using defaults");
            let mut config = AppConfig::default();
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
    }
}

pub fn personality_store(config: &AppConfig) -> PersonalityStore {
    PersonalityStore::new(config.personality_path())
}

/// Everything one request needs, built from config.
pub struct Runtime {
    pub config: AppConfig,
    pub personality: PersonalityConfig,
    pub router: ProviderRouter,
}

/// Text provider used when neither the requested nor the configured
/// default name is registered.
const LAST_RESORT_PROVIDER: &str = "google";

impl Runtime {
    pub fn load() -> Self {
        let config = load_config();
        let personality = personality_store(&config).load();
        Self::from_parts(config, personality)
    }

    pub fn from_parts(config: AppConfig, personality: PersonalityConfig) -> Self {
        let router = build_from_config(&config);
        Self {
            config,
            personality,
            router,
        }
    }

    /// Resolve the text provider name for this invocation. An unknown name
    /// degrades to the configured default, then to [`LAST_RESORT_PROVIDER`].
    fn text_provider_name(&self, overrides: &Overrides) -> Option<String> {
        let requested = overrides
            .provider
            .as_deref()
            .unwrap_or(&self.config.default_provider);

        [requested, self.config.default_provider.as_str(), LAST_RESORT_PROVIDER]
            .into_iter()
            .find(|name| {
                let known = self.router.get(name).is_some();
                if !known {
                    warn!(provider = %name, "Unknown text provider, trying the next default");
                }
                known
            })
            .map(str::to_string)
    }

    /// A text service for the selected provider.
    ///
    /// `default_model` from config only applies to the configured default
    /// provider; `--model` applies to whichever provider is used.
    pub fn text_service(self, overrides: &Overrides) -> Result<CompanionService, Box<dyn std::error::Error>> {
        let name = self
            .text_provider_name(overrides)
            .ok_or("No text provider registered")?;
        let provider = self
            .router
            .get(&name)
            .ok_or_else(|| format!("Unknown text provider '{name}'"))?;

        let mut service = CompanionService::new(provider, self.personality)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_timeout(Duration::from_secs(self.config.request_timeout_secs));

        let configured_model = self
            .config
            .default_model
            .filter(|_| name == self.config.default_provider);
        if let Some(model) = overrides.model.clone().or(configured_model) {
            service = service.with_model(model);
        }
        Ok(service)
    }

    /// An image-only service for the selected image provider.
    pub fn image_service(self, overrides: &Overrides) -> Result<CompanionService, Box<dyn std::error::Error>> {
        let name = overrides
            .provider
            .as_deref()
            .unwrap_or(&self.config.default_image_provider);
        let image = self
            .router
            .get_image(name)
            .ok_or_else(|| format!("Unknown image provider '{name}'"))?;
        let text = self
            .router
            .default()
            .or_else(|| self.router.get(LAST_RESORT_PROVIDER))
            .ok_or("No text provider registered")?;

        Ok(CompanionService::new(text, self.personality)
            .with_image_provider(image)
            .with_image_timeout(Duration::from_secs(self.config.image_timeout_secs)))
    }

    /// A service for media analysis.
    pub fn media_service(self, overrides: &Overrides) -> Result<CompanionService, Box<dyn std::error::Error>> {
        let name = overrides.provider.as_deref().unwrap_or(DEFAULT_MEDIA_ANALYZER);
        let analyzer = self
            .router
            .get_media(name)
            .ok_or_else(|| format!("Unknown media analyzer '{name}'"))?;
        let text = self
            .router
            .default()
            .or_else(|| self.router.get(LAST_RESORT_PROVIDER))
            .ok_or("No text provider registered")?;

        Ok(CompanionService::new(text, self.personality)
            .with_media_analyzer(analyzer)
            .with_image_timeout(Duration::from_secs(self.config.image_timeout_secs)))
    }
}
