//! GetImg text-to-image provider.

use std::time::Duration;

use async_trait::async_trait;
use memgarden_core::error::ProviderError;
use memgarden_core::image::{ImageProvider, ImageRequest, ImageResponse, describe_prompt};
use serde::Deserialize;
use tracing::debug;

use crate::http;

pub const GETIMG_BASE_URL: &str = "https://api.getimg.ai/v1";
pub const GETIMG_MODEL: &str = "stable-diffusion-xl";

pub struct GetImgProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GetImgProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GETIMG_BASE_URL.into(),
            api_key: api_key.into(),
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

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    image: Option<String>,
}

#[async_trait]
impl ImageProvider for GetImgProvider {
    fn name(&self) -> &str {
        "getimg"
    }

    async fn generate(
        &self,
        request: ImageRequest,
    ) -> std::result::Result<ImageResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "GETIMG_API_KEY is not set".into(),
            ));
        }

        let model = request.model.clone().unwrap_or_else(|| GETIMG_MODEL.into());
        let url = format!("{}/{model}/text-to-image", self.base_url);
        let body = serde_json::json!({
            "prompt": request.prompt,
            "width": request.width,
            "height": request.height,
        });

        debug!(model = %model, width = request.width, height = request.height, "Sending GetImg request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(response, "GetImg API").await?;

        let parsed: TextToImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let image_data = parsed.image.filter(|i| !i.is_empty()).ok_or_else(|| {
            ProviderError::InvalidResponse("No image data received from GetImg API".into())
        })?;

        Ok(ImageResponse {
            image_data,
            text_response: describe_prompt(&request.prompt),
            prompt: request.prompt,
            model,
            provider: "getimg".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::serve_once;

    #[tokio::test]
    async fn payment_required_is_quota_exceeded() {
        let base = serve_once("402 Payment Required", br#"{"error":{"code":"quota_exceeded"}}"#.to_vec()).await;
        let provider = GetImgProvider::new("gi-key").with_base_url(base);

        let err = provider.generate(ImageRequest::new("sunset")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "GetImg API quota exceeded. Please add credits to your account."
        );
    }

    #[tokio::test]
    async fn image_is_returned_with_model() {
        let base = serve_once("200 OK", br#"{"image":"iVBORw0KGgo=","seed":42}"#.to_vec()).await;
        let provider = GetImgProvider::new("gi-key").with_base_url(base);

        let image = provider
            .generate(ImageRequest::new("icon").with_size(512, 512).with_model("realistic-vision-v5"))
            .await
            .unwrap();
        assert_eq!(image.image_data, "iVBORw0KGgo=");
        assert_eq!(image.model, "realistic-vision-v5");
        assert_eq!(image.provider, "getimg");
    }

    #[tokio::test]
    async fn missing_image_field_fails() {
        let base = serve_once("200 OK", br#"{"seed":42}"#.to_vec()).await;
        let provider = GetImgProvider::new("gi-key").with_base_url(base);
        let err = provider.generate(ImageRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let err = GetImgProvider::new("").generate(ImageRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
