//! The Provider trait, the abstraction over text-generation oracles.
//!
//! A Provider knows how to send an assembled conversation to an LLM and get
//! a response back, either as a complete message or as a stream of text.
//!
//! Implementations: OpenAI-compatible (OpenAI, LM Studio, Ollama), Gemini,
//! HuggingFace inference.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{Message, Role};

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gemini-2.5-flash", "gpt-3.5-turbo")
    pub model: String,

    /// The conversation turns, system instruction first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            stream: false,
        }
    }

    /// The leading system instruction, if any.
    pub fn system_instruction(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// The non-system turns, in order.
    pub fn turns(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Render the conversation as one plain-text prompt, for oracles that
    /// only accept a single string.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        if let Some(system) = self.system_instruction() {
            out.push_str(system);
            out.push_str("\n\n");
        }
        let turns: Vec<&Message> = self.turns().collect();
        if let Some((last, earlier)) = turns.split_last() {
            if !earlier.is_empty() {
                out.push_str("Previous conversation:\n");
                for m in earlier {
                    out.push_str(&format!("{}: {}\n", speaker(m.role), m.content));
                }
                out.push('\n');
            }
            out.push_str(&format!("{}: {}", speaker(last.role), last.content));
        }
        out
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::Assistant => "Assistant",
        _ => "User",
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub content: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Receiving half of a provider stream.
pub type StreamReceiver =
    tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// The companion service calls `complete()` or `stream()` without knowing
/// which vendor is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "google", "lmstudio").
    fn name(&self) -> &str;

    /// The model used when the caller does not pick one.
    fn default_model(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<StreamReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.content),
                done: false,
                usage: None,
            }))
            .await;
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Whether the provider is reachable.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                content: request.transcript(),
                usage: None,
                model: request.model,
            })
        }
    }

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new("gemini-2.5-flash", vec![]);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!req.stream);
        assert!(req.system_instruction().is_none());
    }

    #[test]
    fn transcript_labels_previous_turns() {
        let req = ProviderRequest::new(
            "m",
            vec![
                Message::system("Be kind."),
                Message::user("Hi"),
                Message::assistant("Hello"),
                Message::user("Tell me more"),
            ],
        );
        assert_eq!(
            req.transcript(),
            "Be kind.\n\nPrevious conversation:\nUser: Hi\nAssistant: Hello\n\nUser: Tell me more"
        );
    }

    #[test]
    fn transcript_without_history() {
        let req = ProviderRequest::new("m", vec![Message::system("S"), Message::user("Q")]);
        assert_eq!(req.transcript(), "S\n\nUser: Q");
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let req = ProviderRequest::new("m", vec![Message::user("ping")]);
        let mut rx = EchoProvider.stream(req).await.unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("User: ping"));
        assert!(!first.done);

        let last = rx.recv().await.unwrap().unwrap();
        assert!(last.done);
        assert!(rx.recv().await.is_none());
    }
}
