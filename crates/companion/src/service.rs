//! Companion service: one oracle call per request, wrapped in assembly on
//! the way out and fallback resolution on the way back.
//!
//! Text failures never reach the caller. A timeout, transport error or bad
//! body is replaced with a [`FallbackReply`] and the result is flagged
//! `fallback: true`. Image and media analysis failures are returned as
//! errors.

use std::sync::Arc;
use std::time::Duration;

use memgarden_config::PersonalityConfig;
use memgarden_core::context::SiteContext;
use memgarden_core::error::{Error, ProviderError};
use memgarden_core::image::{ImageProvider, ImageResponse};
use memgarden_core::media::{MediaAnalysis, MediaAnalyzer};
use memgarden_core::message::Message;
use memgarden_core::provider::{Provider, ProviderRequest, ProviderResponse};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::assembler::{AssembledPrompt, ConversationAssembler};
use crate::media::MediaJob;
use crate::prompts::ImageJob;
use crate::resolver::{FallbackReply, FallbackResolver};

const DEFAULT_TEXT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Model name reported for synthetic replies.
pub const FALLBACK_MODEL: &str = "fallback";

/// The answer to a chat or reflection request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub model: String,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One event of a streamed reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A piece of text, in arrival order.
    Chunk { content: String },

    /// The full reply. Always the last event of a stream.
    Complete {
        content: String,
        model: String,
        fallback: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        /// Set when the oracle failed after text had already been sent.
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        interrupted: bool,
    },

    /// The request could not be started at all.
    Error { error: String },
}

/// Orchestrates assembly, the oracle call and fallback resolution.
pub struct CompanionService {
    provider: Arc<dyn Provider>,
    image_provider: Option<Arc<dyn ImageProvider>>,
    media_analyzer: Option<Arc<dyn MediaAnalyzer>>,
    personality: PersonalityConfig,
    model: Option<String>,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    image_timeout: Duration,
}

impl CompanionService {
    pub fn new(provider: Arc<dyn Provider>, personality: PersonalityConfig) -> Self {
        Self {
            provider,
            image_provider: None,
            media_analyzer: None,
            personality,
            model: None,
            temperature: 0.7,
            max_tokens: None,
            timeout: DEFAULT_TEXT_TIMEOUT,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
        }
    }

    pub fn with_image_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.image_provider = Some(provider);
        self
    }

    pub fn with_media_analyzer(mut self, analyzer: Arc<dyn MediaAnalyzer>) -> Self {
        self.media_analyzer = Some(analyzer);
        self
    }

    /// Override the provider's default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn personality(&self) -> &PersonalityConfig {
        &self.personality
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The model requests are sent with.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    fn request(&self, prompt: AssembledPrompt) -> ProviderRequest {
        prompt.into_request(self.model(), self.temperature, self.max_tokens)
    }

    /// Reply to `message` given the caller's history and site context.
    pub async fn continue_conversation(
        &self,
        message: &str,
        history: &[Message],
        context: Option<&SiteContext>,
    ) -> ChatReply {
        let prompt = ConversationAssembler::new(&self.personality).assemble(message, history, context);
        let request = self.request(prompt);
        self.answer(request, message).await
    }

    /// A short reflective reply about one memory.
    pub async fn reflect_on_memory(&self, title: &str, description: &str) -> ChatReply {
        let prompt = ConversationAssembler::new(&self.personality).reflection(title, description);
        let request = self.request(prompt);
        self.answer(request, &format!("reflection on {title}: {description}")).await
    }

    async fn answer(&self, request: ProviderRequest, fallback_input: &str) -> ChatReply {
        let requested_model = request.model.clone();
        match self.complete(request).await {
            Ok(response) => ChatReply {
                response: response.content,
                model: if response.model.is_empty() {
                    requested_model
                } else {
                    response.model
                },
                fallback: false,
                category: None,
                note: None,
            },
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Oracle call failed, using fallback reply");
                let reply = self.resolve(fallback_input);
                ChatReply {
                    response: reply.text,
                    model: FALLBACK_MODEL.into(),
                    fallback: true,
                    category: Some(reply.category.to_string()),
                    note: Some(format!("{} unavailable, using fallback response", self.provider.name())),
                }
            }
        }
    }

    fn resolve(&self, input: &str) -> FallbackReply {
        FallbackResolver::new(&self.personality).resolve(input)
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(
            provider = self.provider.name(),
            model = %request.model,
            turns = request.messages.len(),
            "Sending conversation"
        );

        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) if response.content.trim().is_empty() => Err(
                ProviderError::InvalidResponse("Oracle returned an empty reply".into()),
            ),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(format!(
                "'{}' did not answer within {}s",
                self.provider.name(),
                self.timeout.as_secs()
            ))),
        }
    }

    /// Stream a reply as [`StreamEvent`]s.
    ///
    /// If the oracle fails before sending any text, the fallback reply is
    /// sent as a single chunk. If it fails part-way, the text already sent
    /// stands and the stream completes with `interrupted: true`.
    pub fn stream_conversation(
        &self,
        message: &str,
        history: &[Message],
        context: Option<&SiteContext>,
    ) -> mpsc::Receiver<StreamEvent> {
        let prompt = ConversationAssembler::new(&self.personality).assemble(message, history, context);
        let mut request = self.request(prompt);
        request.stream = true;

        let fallback = self.resolve(message);
        let provider = self.provider.clone();
        let timeout = self.timeout;
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let model = request.model.clone();
            let mut upstream = match tokio::time::timeout(timeout, provider.stream(request)).await {
                Ok(Ok(upstream)) => upstream,
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "Stream failed to start, using fallback reply");
                    send_fallback(&tx, fallback).await;
                    return;
                }
                Err(_) => {
                    warn!(provider = provider.name(), timeout_secs = timeout.as_secs(), "Stream timed out, using fallback reply");
                    send_fallback(&tx, fallback).await;
                    return;
                }
            };

            let mut full = String::new();
            let failure = loop {
                match tokio::time::timeout(timeout, upstream.recv()).await {
                    Ok(Some(Ok(chunk))) => {
                        if let Some(text) = chunk.content.filter(|t| !t.is_empty()) {
                            full.push_str(&text);
                            if tx.send(StreamEvent::Chunk { content: text }).await.is_err() {
                                return;
                            }
                        }
                        if chunk.done {
                            break None;
                        }
                    }
                    Ok(Some(Err(e))) => break Some(e.to_string()),
                    Ok(None) => break None,
                    Err(_) => break Some(format!("no data within {}s", timeout.as_secs())),
                }
            };

            if full.is_empty() {
                warn!(provider = provider.name(), error = ?failure, "Stream produced no text, using fallback reply");
                send_fallback(&tx, fallback).await;
                return;
            }

            if let Some(reason) = &failure {
                warn!(provider = provider.name(), error = %reason, "Stream interrupted after partial reply");
            }

            let _ = tx
                .send(StreamEvent::Complete {
                    content: full,
                    model,
                    fallback: false,
                    category: None,
                    interrupted: failure.is_some(),
                })
                .await;
        });

        rx
    }

    /// Generate one image. Failures are returned, never replaced.
    pub async fn generate_image(&self, job: &ImageJob) -> Result<ImageResponse, Error> {
        let request = job.build()?;
        let provider = self
            .image_provider
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("No image provider configured".into()))?;

        debug!(provider = provider.name(), kind = job.kind().as_str(), "Generating image");

        match tokio::time::timeout(self.image_timeout, provider.generate(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProviderError::Timeout(format!(
                "Image generation did not finish within {}s",
                self.image_timeout.as_secs()
            ))
            .into()),
        }
    }

    /// Describe one photo or video. Failures are returned, never replaced.
    pub async fn analyze_media(&self, job: &MediaJob) -> Result<MediaAnalysis, Error> {
        let request = job.build()?;
        let analyzer = self
            .media_analyzer
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("No media analyzer configured".into()))?;

        debug!(analyzer = analyzer.name(), mime_type = %request.mime_type, "Analyzing media");

        match tokio::time::timeout(self.image_timeout, analyzer.analyze(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProviderError::Timeout(format!(
                "Media analysis did not finish within {}s",
                self.image_timeout.as_secs()
            ))
            .into()),
        }
    }
}

async fn send_fallback(tx: &mpsc::Sender<StreamEvent>, reply: FallbackReply) {
    if tx
        .send(StreamEvent::Chunk {
            content: reply.text.clone(),
        })
        .await
        .is_err()
    {
        return;
    }
    let _ = tx
        .send(StreamEvent::Complete {
            content: reply.text,
            model: FALLBACK_MODEL.into(),
            fallback: true,
            category: Some(reply.category.to_string()),
            interrupted: false,
        })
        .await;
}
