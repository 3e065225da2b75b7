//! Provider router. Selects the text or image provider named by config.
//!
//! Handles provider creation and lookup so callers only deal in names like
//! `google`, `lmstudio` or `hybrid`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use memgarden_config::AppConfig;
use memgarden_core::image::ImageProvider;
use memgarden_core::media::MediaAnalyzer;
use memgarden_core::provider::Provider;

use crate::fallback::{FallbackImageProvider, FallbackProvider};
use crate::gemini::{GeminiImageProvider, GeminiMediaAnalyzer, GeminiProvider};
use crate::getimg::GetImgProvider;
use crate::huggingface::{HuggingFaceImageProvider, HuggingFaceProvider, TEXT_MODELS};
use crate::openai_compat::OpenAiCompatProvider;

/// Text provider names built in regardless of config.
pub const TEXT_PROVIDERS: &[&str] = &["google", "openai", "lmstudio", "ollama", "huggingface"];

/// Image provider names built in regardless of config.
pub const IMAGE_PROVIDERS: &[&str] = &["google", "getimg", "huggingface", "hybrid"];

/// Media analyzer used when none is named.
pub const DEFAULT_MEDIA_ANALYZER: &str = "google";

/// Routes requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    image_providers: HashMap<String, Arc<dyn ImageProvider>>,
    media_analyzers: HashMap<String, Arc<dyn MediaAnalyzer>>,
    default_provider: String,
    default_image_provider: String,
}

impl ProviderRouter {
    /// Create a new router with default provider names.
    pub fn new(default_provider: impl Into<String>, default_image_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            image_providers: HashMap::new(),
            media_analyzers: HashMap::new(),
            default_provider: default_provider.into(),
            default_image_provider: default_image_provider.into(),
        }
    }

    /// Register a text provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Register an image provider.
    pub fn register_image(&mut self, name: impl Into<String>, provider: Arc<dyn ImageProvider>) {
        self.image_providers.insert(name.into(), provider);
    }

    /// Register a media analyzer.
    pub fn register_media(&mut self, name: impl Into<String>, analyzer: Arc<dyn MediaAnalyzer>) {
        self.media_analyzers.insert(name.into(), analyzer);
    }

    /// Get the default text provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get the default image provider.
    pub fn default_image(&self) -> Option<Arc<dyn ImageProvider>> {
        self.image_providers.get(&self.default_image_provider).cloned()
    }

    /// Get a text provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Get an image provider by name.
    pub fn get_image(&self, name: &str) -> Option<Arc<dyn ImageProvider>> {
        self.image_providers.get(name).cloned()
    }

    /// Get a media analyzer by name.
    pub fn get_media(&self, name: &str) -> Option<Arc<dyn MediaAnalyzer>> {
        self.media_analyzers.get(name).cloned()
    }

    /// All registered text provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// All registered media analyzer names, sorted.
    pub fn list_media(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.media_analyzers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// All registered image provider names, sorted.
    pub fn list_images(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.image_providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build every known provider from configuration.
///
/// Keyed providers are registered even without a key; they fail with
/// `NotConfigured` when called, which the companion treats like any other
/// oracle failure.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider, &config.default_image_provider);
    let text_timeout = Duration::from_secs(config.request_timeout_secs);
    let image_timeout = Duration::from_secs(config.image_timeout_secs);

    let key = |name: &str| config.api_key(name).unwrap_or_default().to_string();
    let url = |name: &str| {
        config
            .provider(name)
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name))
    };
    let model = |name: &str| config.provider(name).and_then(|p| p.default_model.clone());

    // Text
    let mut google = GeminiProvider::new(key("google"))
        .with_base_url(url("google"))
        .with_timeout(text_timeout);
    if let Some(m) = model("google") {
        google = google.with_default_model(m);
    }
    router.register("google", Arc::new(google));

    for name in ["openai", "lmstudio", "ollama"] {
        let mut provider = match name {
            "openai" => OpenAiCompatProvider::openai(key(name)),
            "lmstudio" => OpenAiCompatProvider::lmstudio(None),
            _ => OpenAiCompatProvider::ollama(None),
        };
        provider = provider.with_base_url(url(name)).with_timeout(text_timeout);
        if let Some(m) = model(name) {
            provider = provider.with_default_model(m);
        }
        router.register(name, Arc::new(provider));
    }

    let hf_models: Vec<String> = match model("huggingface") {
        Some(m) => vec![m],
        None => TEXT_MODELS.iter().map(|m| m.to_string()).collect(),
    };
    // Models share the request budget so a stalled one leaves time for the rest
    let per_model = split_budget(text_timeout, hf_models.len());
    let huggingface = hf_models.into_iter().fold(
        FallbackProvider::new("huggingface"),
        |chain, m| {
            let provider = HuggingFaceProvider::new(key("huggingface"), m)
                .with_base_url(url("huggingface"))
                .with_timeout(per_model);
            chain.add(Arc::new(provider), per_model)
        },
    );
    router.register("huggingface", Arc::new(huggingface));

    // Any other configured section with a URL is an OpenAI-compatible server
    for (name, provider_config) in &config.providers {
        if router.get(name).is_some() || name == "getimg" {
            continue;
        }
        let Some(api_url) = provider_config.api_url.clone() else {
            continue;
        };
        let mut provider = OpenAiCompatProvider::new(name, api_url, key(name)).with_timeout(text_timeout);
        if let Some(m) = provider_config.default_model.clone() {
            provider = provider.with_default_model(m);
        }
        router.register(name.clone(), Arc::new(provider));
    }

    // Images
    let google_image: Arc<dyn ImageProvider> = Arc::new(
        GeminiImageProvider::new(key("google"))
            .with_base_url(url("google"))
            .with_timeout(image_timeout),
    );
    let getimg: Arc<dyn ImageProvider> = Arc::new(
        GetImgProvider::new(key("getimg"))
            .with_base_url(url("getimg"))
            .with_timeout(image_timeout),
    );
    let huggingface_image: Arc<dyn ImageProvider> = Arc::new(
        HuggingFaceImageProvider::new(key("huggingface"))
            .with_base_url(url("huggingface"))
            .with_timeout(image_timeout),
    );
    let hybrid = FallbackImageProvider::new("hybrid")
        .add(google_image.clone(), image_timeout)
        .add(getimg.clone(), image_timeout);

    router.register_image("google", google_image);
    router.register_image("getimg", getimg);
    router.register_image("huggingface", huggingface_image);
    router.register_image("hybrid", Arc::new(hybrid));

    // Media analysis
    let mut analyzer = GeminiMediaAnalyzer::new(key("google"))
        .with_base_url(url("google"))
        .with_timeout(image_timeout);
    if let Some(m) = model("google") {
        analyzer = analyzer.with_default_model(m);
    }
    router.register_media("google", Arc::new(analyzer));

    router
}

/// One entry's share of `budget` when `entries` are tried in turn.
fn split_budget(budget: Duration, entries: usize) -> Duration {
    let entries = u32::try_from(entries.max(1)).unwrap_or(u32::MAX);
    budget / entries
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "google" => crate::gemini::GEMINI_BASE_URL.into(),
        "openai" => crate::openai_compat::OPENAI_BASE_URL.into(),
        "lmstudio" => crate::openai_compat::LMSTUDIO_BASE_URL.into(),
        "ollama" => crate::openai_compat::OLLAMA_BASE_URL.into(),
        "huggingface" => crate::huggingface::HUGGINGFACE_BASE_URL.into(),
        "getimg" => crate::getimg::GETIMG_BASE_URL.into(),
        // Unknown names are assumed to be local OpenAI-compatible servers
        _ => crate::openai_compat::LMSTUDIO_BASE_URL.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::stall_then_serve;
    use memgarden_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("lmstudio", "getimg");
        router.register("lmstudio", Arc::new(OpenAiCompatProvider::lmstudio(None)));
        router.register_image("getimg", Arc::new(GetImgProvider::new("k")));

        assert!(router.get("lmstudio").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
        assert!(router.default_image().is_some());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("google").contains("generativelanguage.googleapis.com"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("lmstudio").contains("localhost:1234"));
        assert!(default_base_url("getimg").contains("api.getimg.ai"));
    }

    #[test]
    fn build_from_default_config() {
        let router = build_from_config(&AppConfig::default());
        assert!(router.default().is_some());
        assert_eq!(router.default().unwrap().name(), "google");
        assert_eq!(router.default_image().unwrap().name(), "hybrid");
        for name in TEXT_PROVIDERS {
            assert!(router.get(name).is_some(), "missing text provider {name}");
        }
        let mut expected = IMAGE_PROVIDERS.to_vec();
        expected.sort_unstable();
        assert_eq!(router.list_images(), expected);
        assert_eq!(router.get_media(DEFAULT_MEDIA_ANALYZER).unwrap().name(), "google");
        assert_eq!(router.list_media(), vec!["google"]);
    }

    #[test]
    fn custom_sections_become_openai_compatible() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "vllm".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://localhost:8000/v1".into()),
                default_model: Some("mistral".into()),
            },
        );
        let router = build_from_config(&config);
        let vllm = router.get("vllm").unwrap();
        assert_eq!(vllm.default_model(), "mistral");
    }

    #[test]
    fn budget_is_split_between_entries() {
        assert_eq!(split_budget(Duration::from_secs(30), 5), Duration::from_secs(6));
        assert_eq!(split_budget(Duration::from_secs(30), 1), Duration::from_secs(30));
        assert_eq!(split_budget(Duration::from_secs(30), 0), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn stalled_huggingface_model_leaves_time_for_the_next() {
        let base = stall_then_serve(r#"[{"generated_text":"What did the garden smell like?"}]"#).await;
        let mut config = AppConfig::default();
        config.request_timeout_secs = 5;
        config.providers.insert(
            "huggingface".into(),
            ProviderConfig {
                api_key: Some("hf-key".into()),
                api_url: Some(base),
                default_model: None,
            },
        );

        let chain = build_from_config(&config).get("huggingface").unwrap();
        let request = memgarden_core::ProviderRequest::new(
            chain.default_model(),
            vec![memgarden_core::Message::user("I planted roses")],
        );
        let budget = Duration::from_secs(config.request_timeout_secs);
        let response = tokio::time::timeout(budget, chain.complete(request))
            .await
            .expect("chain must answer within the request budget")
            .unwrap();

        assert_eq!(response.content, "What did the garden smell like?");
        assert_eq!(response.model, TEXT_MODELS[1]);
    }

    #[test]
    fn lmstudio_model_override() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "lmstudio".into(),
            ProviderConfig {
                default_model: Some("deepseek-r1".into()),
                ..Default::default()
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.get("lmstudio").unwrap().default_model(), "deepseek-r1");
    }
}
