//! ImageProvider trait, the abstraction over image-generation oracles.
//!
//! Unlike text, there is no synthetic stand-in for a failed image call:
//! errors are returned to the caller unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One image to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Descriptive text prompt
    pub prompt: String,

    /// Provider-specific model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_side")]
    pub width: u32,

    #[serde(default = "default_side")]
    pub height: u32,
}

fn default_side() -> u32 {
    1024
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            width: default_side(),
            height: default_side(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Base64-encoded image bytes
    pub image_data: String,

    /// Short human-readable description of what was generated
    pub text_response: String,

    /// The prompt that produced the image
    pub prompt: String,

    /// Model that produced the image
    pub model: String,

    /// Provider that produced the image
    pub provider: String,
}

/// Summary line shown next to a generated image.
pub fn describe_prompt(prompt: &str) -> String {
    let head: String = prompt.chars().take(50).collect();
    format!("Generated realistic image: {head}...")
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "getimg").
    fn name(&self) -> &str;

    /// Generate a single image.
    async fn generate(
        &self,
        request: ImageRequest,
    ) -> std::result::Result<ImageResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_to_square_1024() {
        let req: ImageRequest = serde_json::from_str(r#"{"prompt":"a garden"}"#).unwrap();
        assert_eq!((req.width, req.height), (1024, 1024));
        assert!(req.model.is_none());
    }

    #[test]
    fn description_truncates_on_char_boundary() {
        let prompt = "🌅".repeat(60);
        let text = describe_prompt(&prompt);
        assert_eq!(text.chars().filter(|c| *c == '🌅').count(), 50);
        assert!(text.ends_with("..."));
    }
}
