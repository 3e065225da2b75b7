//! MediaAnalyzer trait, the abstraction over oracles that describe a photo
//! or video.
//!
//! Like images, a failed analysis has no synthetic stand-in: errors are
//! returned to the caller unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One piece of media plus the question asked about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRequest {
    pub prompt: String,

    /// e.g. `image/png`, `video/mp4`
    pub mime_type: String,

    /// Base64-encoded media bytes
    pub data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl MediaRequest {
    pub fn new(prompt: impl Into<String>, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            mime_type: mime_type.into(),
            data: data.into(),
            model: None,
        }
    }
}

/// What the oracle said about the media.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAnalysis {
    pub text: String,
    pub model: String,
    pub provider: String,
}

#[async_trait]
pub trait MediaAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Describe the media in `request`.
    async fn analyze(
        &self,
        request: MediaRequest,
    ) -> std::result::Result<MediaAnalysis, ProviderError>;
}
