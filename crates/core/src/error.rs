//! Error types for the Memory Garden domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Oracle failures, caller input failures and configuration failures
//! each get their own enum so call sites can decide which ones to absorb.

use thiserror::Error;

/// The top-level error type for all Memory Garden operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Caller input errors ---
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures talking to a text or image oracle.
///
/// Every way a vendor call can go wrong (transport, status, body) is
/// normalized into one of these variants.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("{provider} quota exceeded. Please add credits to your account.")]
    QuotaExceeded { provider: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),
}

/// Malformed data handed to us by the calling process.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    #[error("Invalid conversation history JSON: {0}")]
    InvalidHistory(String),

    #[error("Invalid context JSON: {0}")]
    InvalidContext(String),

    #[error("Invalid request JSON: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    MissingField(String),

    #[error("{0}")]
    UnsupportedMedia(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "Service Unavailable".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn quota_error_names_provider() {
        let err = ProviderError::QuotaExceeded {
            provider: "GetImg".into(),
        };
        assert_eq!(
            err.to_string(),
            "GetImg quota exceeded. Please add credits to your account."
        );
    }

    #[test]
    fn input_error_wraps_into_top_level() {
        let err: Error = InputError::InvalidHistory("expected value".into()).into();
        assert!(err.to_string().contains("conversation history"));
    }
}
