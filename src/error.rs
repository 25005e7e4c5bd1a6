//! Error taxonomy for the analysis engine.
//!
//! Validation and configuration problems are surfaced immediately and are never
//! worth retrying; only `Provider` failures (remote I/O, unexpected payloads)
//! are transient from the caller's point of view.

use thiserror::Error;

use crate::config::ProviderKind;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Uninitialized engine, empty text, or a disabled feature was invoked.
    #[error("validation error: {0}")]
    Validation(String),

    /// The selected provider has no credential configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Provider is not registered or does not support the language/mode.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Remote call failed or returned an unexpected shape.
    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn provider(provider: ProviderKind, msg: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.as_str().to_string(),
            message: msg.into(),
        }
    }

    /// Short machine-readable tag, used for metrics labels and HTTP bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Configuration(_) => "configuration",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::Provider { .. } => "provider",
        }
    }

    /// Only remote provider failures may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_errors_are_retryable() {
        assert!(!EngineError::validation("empty").is_retryable());
        assert!(!EngineError::configuration("no key").is_retryable());
        assert!(!EngineError::unavailable("nope").is_retryable());
        assert!(EngineError::provider(ProviderKind::OpenAi, "502").is_retryable());
    }

    #[test]
    fn display_includes_provider_id() {
        let e = EngineError::provider(ProviderKind::Azure, "bad gateway");
        assert_eq!(e.to_string(), "provider azure failed: bad gateway");
        assert_eq!(e.kind(), "provider");
    }
}
