//! Provider fallback: an ordered retry chain with per-provider timeouts.
//!
//! When a provider fails (timeout, rate limit, error), the next one in the
//! chain is tried. The last error is returned if every entry fails; for
//! images that error surfaces to the caller unchanged.

use async_trait::async_trait;
use memgarden_core::error::ProviderError;
use memgarden_core::image::{ImageProvider, ImageRequest, ImageResponse};
use memgarden_core::provider::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single entry in a fallback chain.
struct FallbackEntry<P: ?Sized> {
    provider: Arc<P>,
    timeout: Duration,
}

/// Run `call` against each entry until one succeeds.
async fn run_chain<P, T, F, Fut>(
    chain: &[FallbackEntry<P>],
    label: &str,
    name_of: impl Fn(&P) -> String,
    call: F,
) -> Result<T, ProviderError>
where
    P: ?Sized,
    F: Fn(Arc<P>) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut last_error = ProviderError::NotConfigured("No providers in fallback chain".into());

    for (i, entry) in chain.iter().enumerate() {
        let provider_name = name_of(&entry.provider);

        info!(
            provider = %provider_name,
            attempt = i + 1,
            total = chain.len(),
            "Fallback: trying provider ({label})"
        );

        match tokio::time::timeout(entry.timeout, call(entry.provider.clone())).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                warn!(
                    provider = %provider_name,
                    error = %e,
                    "Fallback: provider failed, trying next"
                );
                last_error = e;
            }
            Err(_) => {
                warn!(
                    provider = %provider_name,
                    timeout_secs = entry.timeout.as_secs(),
                    "Fallback: provider timed out, trying next"
                );
                last_error = ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    provider_name,
                    entry.timeout.as_secs()
                ));
            }
        }
    }

    Err(last_error)
}

/// A text provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry<dyn memgarden_core::Provider>>,
}

impl FallbackProvider {
    /// Create a new fallback provider with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a provider to the fallback chain with a custom timeout.
    pub fn add(mut self, provider: Arc<dyn memgarden_core::Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    /// Add a provider with the default timeout (30s).
    pub fn add_default(self, provider: Arc<dyn memgarden_core::Provider>) -> Self {
        self.add(provider, DEFAULT_TIMEOUT)
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl memgarden_core::Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        self.chain
            .first()
            .map(|e| e.provider.default_model())
            .unwrap_or("")
    }

    /// Each entry is asked with its own default model; the model on the
    /// incoming request only names the chain.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        run_chain(
            &self.chain,
            "complete",
            |p| p.name().to_string(),
            |provider| {
                let mut request = request.clone();
                request.model = provider.default_model().to_string();
                async move { provider.complete(request).await }
            },
        )
        .await
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<StreamReceiver, ProviderError> {
        run_chain(
            &self.chain,
            "stream",
            |p| p.name().to_string(),
            |provider| {
                let mut request = request.clone();
                request.model = provider.default_model().to_string();
                async move { provider.stream(request).await }
            },
        )
        .await
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let mut all_models = Vec::new();
        for entry in &self.chain {
            if let Ok(models) = entry.provider.list_models().await {
                all_models.extend(models);
            }
        }
        Ok(all_models)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        for entry in &self.chain {
            if let Ok(true) = entry.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// An image provider that tries each wrapped provider in order.
pub struct FallbackImageProvider {
    name: String,
    chain: Vec<FallbackEntry<dyn ImageProvider>>,
}

impl FallbackImageProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    pub fn add(mut self, provider: Arc<dyn ImageProvider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl ImageProvider for FallbackImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        request: ImageRequest,
    ) -> std::result::Result<ImageResponse, ProviderError> {
        run_chain(
            &self.chain,
            "image",
            |p| p.name().to_string(),
            |provider| {
                let request = request.clone();
                async move { provider.generate(request).await }
            },
        )
        .await
    }
}
