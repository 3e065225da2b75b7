//! # Memory Garden Core
//!
//! Domain types, traits, and error definitions for the Memory Garden
//! companion. This crate has **no HTTP or config dependencies**. It
//! defines the model that the provider and companion crates implement
//! against.
//!
//! Oracles are traits here ([`Provider`] for text, [`ImageProvider`] for
//! images, [`MediaAnalyzer`] for describing uploads) so the conversational
//! logic is written once and each vendor is injected behind the trait.

pub mod context;
pub mod error;
pub mod image;
pub mod media;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use context::{MEMORY_GARDEN_SITE, SiteContext};
pub use error::{Error, InputError, ProviderError, Result};
pub use image::{ImageProvider, ImageRequest, ImageResponse};
pub use media::{MediaAnalysis, MediaAnalyzer, MediaRequest};
pub use message::{ConversationContext, HISTORY_WINDOW, Message, Role, parse_history};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, StreamReceiver, Usage};
