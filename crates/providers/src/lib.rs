//! Text and image provider implementations for Memory Garden.
//!
//! Text providers implement `memgarden_core::Provider`, image providers
//! implement `memgarden_core::ImageProvider` and media analyzers implement
//! `memgarden_core::MediaAnalyzer`. The router builds them from `AppConfig`
//! and hands them out by name.

mod http;

pub mod fallback;
pub mod gemini;
pub mod getimg;
pub mod huggingface;
pub mod openai_compat;
pub mod router;

pub use fallback::{FallbackImageProvider, FallbackProvider};
pub use gemini::{GeminiImageProvider, GeminiMediaAnalyzer, GeminiProvider};
pub use getimg::GetImgProvider;
pub use huggingface::{HuggingFaceImageProvider, HuggingFaceProvider};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
