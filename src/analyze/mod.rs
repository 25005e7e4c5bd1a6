// src/analyze/mod.rs
//! Provider abstraction: a capability descriptor plus an `analyze` /
//! optional `batch_analyze` contract, implemented by the local lexicon
//! analyzer and the remote adapters.

pub mod aspects;
pub mod azure;
pub mod emotion;
pub mod local;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheKey;
use crate::config::{AnalysisMode, ProviderKind, Sensitivity};
use crate::error::{EngineError, Result};
use crate::lexicon::{self, Lexicon, MergedLexicon};
use crate::result::{AnalysisResult, AspectReport};

// Re-export convenient types.
pub use crate::analyze::azure::AzureProvider;
pub use crate::analyze::emotion::{EmotionClassifier, LexiconEmotionClassifier};
pub use crate::analyze::local::LocalProvider;
pub use crate::analyze::mock::MockProvider;
pub use crate::analyze::openai::OpenAiProvider;

/// Per-call overrides; unset fields fall back to the engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub provider: Option<ProviderKind>,
    pub mode: Option<AnalysisMode>,
    pub language: Option<String>,
    /// Selects a domain-specific lexicon overlay.
    pub domain: Option<String>,
}

impl AnalysisOptions {
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Options after defaults are applied; what providers actually see.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub provider: ProviderKind,
    pub mode: AnalysisMode,
    pub language: String,
    pub domain: Option<String>,
    pub sensitivity: Sensitivity,
    /// Overlay for `domain`, if one is registered.
    pub domain_lexicon: Option<Arc<Lexicon>>,
}

impl ResolvedOptions {
    pub fn is_detailed(&self) -> bool {
        self.mode == AnalysisMode::Detailed
    }

    pub fn cache_key(&self, text: &str) -> CacheKey {
        CacheKey::new(
            text,
            self.provider,
            &self.language,
            self.mode,
            self.domain.as_deref(),
        )
    }

    /// Default table for the language, with the domain overlay on top.
    pub fn lexicon(&self) -> MergedLexicon<'_> {
        MergedLexicon::new(
            lexicon::sentiment_lexicon(&self.language),
            self.domain_lexicon.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderFamily {
    LexiconBased,
    AiBased,
    ApiBased,
}

/// Capability descriptor, fixed at registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub id: ProviderKind,
    pub name: String,
    pub family: ProviderFamily,
    pub supported_languages: Vec<String>,
    pub supported_modes: Vec<AnalysisMode>,
    pub max_text_length: usize,
}

impl ProviderDescriptor {
    pub fn new(
        id: ProviderKind,
        name: &str,
        family: ProviderFamily,
        languages: &[&str],
        modes: &[AnalysisMode],
        max_text_length: usize,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            family,
            supported_languages: languages.iter().map(|l| l.to_string()).collect(),
            supported_modes: modes.to_vec(),
            max_text_length,
        }
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.supported_languages.iter().any(|l| l == language)
    }

    pub fn supports_mode(&self, mode: AnalysisMode) -> bool {
        self.supported_modes.contains(&mode)
    }
}

/// Descriptor plus runtime state, as reported by `available_providers()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    #[serde(flatten)]
    pub descriptor: ProviderDescriptor,
    pub supports_batch: bool,
    pub configured: bool,
}

#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn id(&self) -> ProviderKind {
        self.descriptor().id
    }

    /// Whether the credential this provider needs is present.
    fn is_configured(&self) -> bool {
        true
    }

    async fn analyze(&self, text: &str, options: &ResolvedOptions) -> Result<AnalysisResult>;

    /// Whether `batch_analyze` is a real (single round-trip) endpoint.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Results map 1:1 to `texts` by position.
    async fn batch_analyze(
        &self,
        _texts: &[String],
        _options: &ResolvedOptions,
    ) -> Result<Vec<AnalysisResult>> {
        Err(EngineError::provider(
            self.id(),
            "batch analysis is not supported",
        ))
    }

    /// Provider-backed aspect extraction. `Ok(None)` means "not available,
    /// use the rule-based path".
    async fn extract_aspects(
        &self,
        _text: &str,
        _categories: &[String],
        _options: &ResolvedOptions,
    ) -> Result<Option<AspectReport>> {
        Ok(None)
    }
}

pub type DynProvider = Arc<dyn Provider>;

/// Shared reqwest client for remote adapters.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("chat-sentiment-engine/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| EngineError::configuration(format!("building HTTP client: {e}")))
}

/// Turn a reqwest failure into a provider error (timeouts included).
pub(crate) fn transport_error(provider: ProviderKind, e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::provider(provider, "request timed out")
    } else {
        EngineError::provider(provider, format!("request failed: {e}"))
    }
}
