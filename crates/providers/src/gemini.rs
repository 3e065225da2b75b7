//! Google Gemini provider over the raw `generateContent` REST API.
//!
//! Text replies use `systemInstruction` plus role-tagged `contents`
//! (`user` / `model`). Image generation asks an image-capable model for
//! `TEXT` + `IMAGE` modalities and returns the first inline image part.
//! Media analysis sends the prompt plus the upload as an `inlineData` part.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use memgarden_core::error::ProviderError;
use memgarden_core::image::{ImageProvider, ImageRequest, ImageResponse, describe_prompt};
use memgarden_core::media::{MediaAnalysis, MediaAnalyzer, MediaRequest};
use memgarden_core::message::Role;
use memgarden_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::http::{self, SseBuffer};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const GEMINI_IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Connection details shared by the text and image halves.
#[derive(Clone)]
struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            base_url: GEMINI_BASE_URL.into(),
            api_key,
            client: http::client(timeout),
        }
    }

    fn key(&self) -> Result<&str, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "GOOGLE_AI_API_KEY is not set".into(),
            ));
        }
        Ok(&self.api_key)
    }

    async fn post(
        &self,
        model: &str,
        method: &str,
        body: &GenerateRequest,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.key()?;
        let separator = if method.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}/models/{model}:{method}{separator}key={key}",
            self.base_url
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(http::transport_error)?;

        http::check_status(response, "Google AI").await
    }
}

/// Gemini text provider.
pub struct GeminiProvider {
    inner: GeminiClient,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            inner: GeminiClient::new(api_key.into(), Duration::from_secs(30)),
            default_model: GEMINI_TEXT_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner.client = http::client(timeout);
        self
    }

    fn build_request(request: &ProviderRequest) -> GenerateRequest {
        let contents = request
            .turns()
            .filter_map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    _ => return None,
                };
                Some(Content {
                    role: Some(role.into()),
                    parts: vec![Part::text(&m.content)],
                })
            })
            .collect();

        GenerateRequest {
            contents,
            system_instruction: request.system_instruction().map(|s| Content {
                role: None,
                parts: vec![Part::text(s)],
            }),
            generation_config: GenerationConfig {
                temperature: Some(request.temperature),
                max_output_tokens: request.max_tokens,
                response_modalities: None,
            },
        }
    }
}

#[async_trait]
impl memgarden_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::build_request(&request);
        debug!(model = %request.model, turns = body.contents.len(), "Sending Gemini request");

        let response = self
            .inner
            .post(&request.model, "generateContent", &body)
            .await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let content = parsed.text();
        if content.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No text in Gemini response".into(),
            ));
        }

        Ok(ProviderResponse {
            content,
            usage: parsed.usage_metadata.map(Usage::from),
            model: parsed.model_version.unwrap_or(request.model),
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<StreamReceiver, ProviderError> {
        let body = Self::build_request(&request);
        debug!(model = %request.model, "Sending Gemini streaming request");

        let response = self
            .inner
            .post(&request.model, "streamGenerateContent?alt=sse", &body)
            .await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut sse = SseBuffer::default();
            let mut usage = None;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for data in sse.push(&bytes).into_iter() {
                    match serde_json::from_str::<GenerateResponse>(&data) {
                        Ok(parsed) => {
                            if let Some(u) = parsed.usage_metadata.clone() {
                                usage = Some(Usage::from(u));
                            }
                            let text = parsed.text();
                            if text.is_empty() {
                                continue;
                            }
                            let chunk = StreamChunk {
                                content: Some(text),
                                ..Default::default()
                            };
                            if tx.send(Ok(chunk)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => trace!(error = %e, "Ignoring unparseable Gemini SSE chunk"),
                    }
                }
            }

            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    done: true,
                    usage,
                }))
                .await;
        });

        Ok(rx)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let key = self.inner.key()?;
        let url = format!("{}/models?key={key}", self.inner.base_url);
        let response = self
            .inner
            .client
            .get(&url)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status(response, "Google AI").await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(body["models"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["name"].as_str())
                    .map(|n| n.trim_start_matches("models/").to_string())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        self.list_models().await.map(|_| true)
    }
}

/// Gemini image generation.
pub struct GeminiImageProvider {
    inner: GeminiClient,
    model: String,
}

impl GeminiImageProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            inner: GeminiClient::new(api_key.into(), Duration::from_secs(60)),
            model: GEMINI_IMAGE_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner.client = http::client(timeout);
        self
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn generate(
        &self,
        request: ImageRequest,
    ) -> std::result::Result<ImageResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text(&request.prompt)],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: None,
                max_output_tokens: None,
                response_modalities: Some(vec!["TEXT".into(), "IMAGE".into()]),
            },
        };

        debug!(model = %model, "Sending Gemini image request");
        let response = self.inner.post(&model, "generateContent", &body).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let image_data = parsed
            .inline_image()
            .ok_or_else(|| ProviderError::InvalidResponse("No image data received from API".into()))?;

        let text = parsed.text();
        Ok(ImageResponse {
            image_data,
            text_response: if text.trim().is_empty() {
                describe_prompt(&request.prompt)
            } else {
                text
            },
            prompt: request.prompt,
            model,
            provider: "google".into(),
        })
    }
}

/// Gemini photo and video understanding.
pub struct GeminiMediaAnalyzer {
    inner: GeminiClient,
    model: String,
}

impl GeminiMediaAnalyzer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            inner: GeminiClient::new(api_key.into(), Duration::from_secs(60)),
            model: GEMINI_TEXT_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inner.client = http::client(timeout);
        self
    }

    fn build_request(request: &MediaRequest) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![
                    Part::text(&request.prompt),
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: Some(request.mime_type.clone()),
                            data: request.data.clone(),
                        }),
                    },
                ],
            }],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: None,
                max_output_tokens: None,
                response_modalities: None,
            },
        }
    }
}

#[async_trait]
impl MediaAnalyzer for GeminiMediaAnalyzer {
    fn name(&self) -> &str {
        "google"
    }

    async fn analyze(
        &self,
        request: MediaRequest,
    ) -> std::result::Result<MediaAnalysis, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let body = Self::build_request(&request);

        debug!(model = %model, mime_type = %request.mime_type, bytes = request.data.len(), "Sending Gemini media request");
        let response = self.inner.post(&model, "generateContent", &body).await?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No analysis in Gemini response".into(),
            ));
        }

        Ok(MediaAnalysis {
            text,
            model: parsed.model_version.unwrap_or(model),
            provider: "google".into(),
        })
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl From<UsageMetadata> for Usage {
    fn from(u: UsageMetadata) -> Self {
        Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        }
    }
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .into_iter()
            .flat_map(|c| c.parts.iter())
    }

    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.parts().filter_map(|p| p.text.as_deref()).collect()
    }

    fn inline_image(&self) -> Option<String> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
            .map(|d| d.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::serve_once;
    use memgarden_core::Provider;
    use memgarden_core::message::Message;

    fn request() -> ProviderRequest {
        ProviderRequest::new(
            GEMINI_TEXT_MODEL,
            vec![
                Message::system("Be kind."),
                Message::user("Hi"),
                Message::assistant("Hello!"),
                Message::user("I walked by the sea"),
            ],
        )
    }

    #[test]
    fn request_uses_system_instruction_and_model_role() {
        let body = serde_json::to_value(GeminiProvider::build_request(&request())).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be kind.");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "I walked by the sea");
        assert!(body["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn response_text_joins_parts() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"friend"}]}}],
            "usageMetadata":{"promptTokenCount":4,"candidatesTokenCount":2,"totalTokenCount":6}}"#;
        let parsed: GenerateResponse = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.text(), "Hello friend");
        assert_eq!(Usage::from(parsed.usage_metadata.unwrap()).total_tokens, 6);
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(parsed.text(), "");
        assert!(parsed.inline_image().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let err = GeminiProvider::new("").complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn completion_round_trip_against_stub() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"What a lovely walk."}]}}]}"#;
        let base = serve_once("200 OK", body.to_vec()).await;
        let provider = GeminiProvider::new("g-key").with_base_url(base);

        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "What a lovely walk.");
        assert_eq!(response.model, GEMINI_TEXT_MODEL);
    }

    #[tokio::test]
    async fn image_parts_are_extracted() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"Here you go"},{"inlineData":{"mimeType":"image/png","data":"aGVsbG8="}}]}}]}"#;
        let base = serve_once("200 OK", body.to_vec()).await;
        let provider = GeminiImageProvider::new("g-key").with_base_url(base);

        let image = provider.generate(ImageRequest::new("a garden")).await.unwrap();
        assert_eq!(image.image_data, "aGVsbG8=");
        assert_eq!(image.text_response, "Here you go");
        assert_eq!(image.model, GEMINI_IMAGE_MODEL);
    }

    #[test]
    fn media_request_carries_inline_data() {
        let request = MediaRequest::new("What is in this photo?", "image/png", "aGVsbG8=");
        let body = serde_json::to_value(GeminiMediaAnalyzer::build_request(&request)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "What is in this photo?");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
        assert!(parts[1].get("text").is_none());
    }

    #[tokio::test]
    async fn media_analysis_against_stub() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"A family on a beach. What do you remember most?"}]}}]}"#;
        let base = serve_once("200 OK", body.to_vec()).await;
        let analyzer = GeminiMediaAnalyzer::new("g-key").with_base_url(base);

        let analysis = analyzer
            .analyze(MediaRequest::new("Describe", "image/jpeg", "aGVsbG8="))
            .await
            .unwrap();
        assert!(analysis.text.starts_with("A family on a beach"));
        assert_eq!(analysis.model, GEMINI_TEXT_MODEL);
        assert_eq!(analysis.provider, "google");
    }

    #[tokio::test]
    async fn media_analysis_failure_is_returned() {
        let base = serve_once("400 Bad Request", br#"{"error":{"message":"Unsupported MIME type"}}"#.to_vec()).await;
        let analyzer = GeminiMediaAnalyzer::new("g-key").with_base_url(base);

        let err = analyzer
            .analyze(MediaRequest::new("Describe", "video/avi", "aGVsbG8="))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 400, .. }));
    }

    #[tokio::test]
    async fn media_analysis_without_key_is_not_configured() {
        let err = GeminiMediaAnalyzer::new("")
            .analyze(MediaRequest::new("Describe", "image/jpeg", "aGVsbG8="))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn image_without_inline_data_fails() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"I cannot draw that"}]}}]}"#;
        let base = serve_once("200 OK", body.to_vec()).await;
        let provider = GeminiImageProvider::new("g-key").with_base_url(base);

        let err = provider.generate(ImageRequest::new("a garden")).await.unwrap_err();
        assert!(err.to_string().contains("No image data"));
    }
}
