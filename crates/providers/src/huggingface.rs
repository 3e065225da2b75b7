//! HuggingFace Inference API: text generation and text-to-image.
//!
//! Text models only take a single string, so the conversation is rendered
//! with [`ProviderRequest::transcript`]. Small hosted models are often cold
//! or missing; chain several of them with [`crate::FallbackProvider`]
//! (see [`TEXT_MODELS`]).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use memgarden_core::error::ProviderError;
use memgarden_core::image::{ImageProvider, ImageRequest, ImageResponse, describe_prompt};
use memgarden_core::provider::*;
use tracing::debug;

use crate::http;

pub const HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co/models";
pub const HUGGINGFACE_IMAGE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

/// Text models tried in order, smallest first.
pub const TEXT_MODELS: &[&str] = &[
    "sshleifer/tiny-gpt2",
    "distilgpt2",
    "microsoft/DialoGPT-tiny",
    "EleutherAI/gpt-neo-125M",
    "gpt2",
];

fn not_configured() -> ProviderError {
    ProviderError::NotConfigured("HUGGINGFACE_API_KEY is not set".into())
}

/// One hosted text-generation model.
pub struct HuggingFaceProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HuggingFaceProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: HUGGINGFACE_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: http::client(Duration::from_secs(30)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }
}

/// Pull `generated_text` out of either a list or a single-object reply and
/// drop the echoed prompt.
fn extract_generated_text(body: &serde_json::Value, prompt: &str) -> Option<String> {
    let entry = match body {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    let generated = entry.get("generated_text")?.as_str()?;
    Some(generated.replace(prompt, "").trim().to_string())
}

#[async_trait]
impl memgarden_core::Provider for HuggingFaceProvider {
    fn name(&self) -> &str {
        &self.model
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(not_configured());
        }

        let prompt = request.transcript();
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": {
                "max_length": request.max_tokens.unwrap_or(100),
                "temperature": request.temperature,
                "do_sample": true,
                "return_full_text": false,
            }
        });

        let url = format!("{}/{}", self.base_url, self.model);
        debug!(model = %self.model, "Sending HuggingFace text request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(response, "HuggingFace API").await?;

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = extract_generated_text(&parsed, &prompt)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidResponse(format!(
                    "Unexpected response format from {}",
                    self.model
                ))
            })?;

        Ok(ProviderResponse {
            content,
            usage: None,
            model: self.model.clone(),
        })
    }
}

/// HuggingFace text-to-image; the API answers with raw image bytes.
pub struct HuggingFaceImageProvider {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl HuggingFaceImageProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: HUGGINGFACE_BASE_URL.into(),
            api_key: api_key.into(),
            model: HUGGINGFACE_IMAGE_MODEL.into(),
            client: http::client(Duration::from_secs(60)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }
}

#[async_trait]
impl ImageProvider for HuggingFaceImageProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn generate(
        &self,
        request: ImageRequest,
    ) -> std::result::Result<ImageResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(not_configured());
        }

        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let body = serde_json::json!({
            "inputs": request.prompt,
            "parameters": {
                "num_inference_steps": 20,
                "guidance_scale": 7.5,
                "width": request.width,
                "height": request.height,
            }
        });

        debug!(model = %model, "Sending HuggingFace image request");
        let response = self
            .client
            .post(format!("{}/{model}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(response, "HuggingFace API").await?;

        let bytes = response.bytes().await.map_err(http::transport_error)?;
        if bytes.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No image data received from HuggingFace API".into(),
            ));
        }

        Ok(ImageResponse {
            image_data: STANDARD.encode(&bytes),
            text_response: describe_prompt(&request.prompt),
            prompt: request.prompt,
            model,
            provider: "huggingface".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::serve_once;
    use memgarden_core::Provider;
    use memgarden_core::message::Message;

    #[test]
    fn generated_text_from_list_strips_prompt() {
        let body = serde_json::json!([{"generated_text": "User: hi there friend"}]);
        assert_eq!(
            extract_generated_text(&body, "User: hi").as_deref(),
            Some("there friend")
        );
    }

    #[test]
    fn generated_text_from_object() {
        let body = serde_json::json!({"generated_text": "  hello  "});
        assert_eq!(extract_generated_text(&body, "x").as_deref(), Some("hello"));
        assert!(extract_generated_text(&serde_json::json!({"error": "loading"}), "x").is_none());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = HuggingFaceProvider::new("", "gpt2");
        let req = ProviderRequest::new("gpt2", vec![Message::user("hi")]);
        assert!(matches!(
            provider.complete(req).await.unwrap_err(),
            ProviderError::NotConfigured(_)
        ));
    }

    #[tokio::test]
    async fn loading_model_is_an_error() {
        let base = serve_once("503 Service Unavailable", br#"{"error":"Model is loading"}"#.to_vec()).await;
        let provider = HuggingFaceProvider::new("hf-key", "gpt2").with_base_url(base);
        let req = ProviderRequest::new("gpt2", vec![Message::user("hi")]);
        assert!(matches!(
            provider.complete(req).await.unwrap_err(),
            ProviderError::ApiError { status_code: 503, .. }
        ));
    }

    #[tokio::test]
    async fn image_bytes_are_base64_encoded() {
        let base = serve_once("200 OK", b"hello".to_vec()).await;
        let provider = HuggingFaceImageProvider::new("hf-key").with_base_url(base);
        let image = provider
            .generate(ImageRequest::new("a quiet garden at dusk"))
            .await
            .unwrap();
        assert_eq!(image.image_data, "aGVsbG8=");
        assert_eq!(image.provider, "huggingface");
        assert!(image.text_response.starts_with("Generated realistic image: a quiet garden"));
    }
}
