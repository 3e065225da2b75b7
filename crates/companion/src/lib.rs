//! # Memory Garden Companion
//!
//! The conversational layer that sits between the front end and the
//! oracles: [`ConversationAssembler`] builds what is sent,
//! [`FallbackResolver`] decides what to say when nothing comes back, and
//! [`CompanionService`] ties both to an injected [`Provider`](memgarden_core::Provider).

pub mod assembler;
pub mod media;
pub mod prompts;
pub mod resolver;
pub mod service;

pub use assembler::{AssembledPrompt, ConversationAssembler};
pub use media::{MediaJob, MediaKind};
pub use prompts::{ImageJob, ImageKind};
pub use resolver::{CATEGORIES, FallbackReply, FallbackResolver, KeywordCategory};
pub use service::{ChatReply, CompanionService, FALLBACK_MODEL, StreamEvent};
