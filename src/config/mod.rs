// src/config/mod.rs
//! Engine-wide configuration.
//!
//! Loaded once at startup from TOML or JSON (see [`EngineConfig::load_default`]);
//! every field has a default so a partial file is fine. Per-call
//! [`AnalysisOptions`](crate::analyze::AnalysisOptions) fall back to these values.

pub mod credentials;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::lexicon::Lexicon;

pub use credentials::Credentials;

pub const ENV_CONFIG_PATH: &str = "SENTIMENT_CONFIG_PATH";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_AZURE_KEY: &str = "AZURE_TEXT_ANALYTICS_KEY";

/// Which analyzer serves a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
    Azure,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] =
        [ProviderKind::Local, ProviderKind::OpenAi, ProviderKind::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::OpenAi => "openai",
            Self::Azure => "azure",
        }
    }

    /// Env var consulted when the configured key is the literal `"ENV"`.
    pub fn key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::Local => None,
            Self::OpenAi => Some(ENV_OPENAI_KEY),
            Self::Azure => Some(ENV_AZURE_KEY),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "lexicon" => Ok(Self::Local),
            "openai" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            other => Err(format!("unknown provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Standard,
    Detailed,
    Academic,
    Social,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Detailed => "detailed",
            Self::Academic => "academic",
            Self::Social => "social",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scales raw lexicon masses before the compound score is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    pub fn factor(&self) -> f64 {
        match self {
            Self::Low => 0.7,
            Self::Medium => 1.0,
            Self::High => 1.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis_provider: ProviderKind,
    pub analysis_mode: AnalysisMode,
    /// ISO-639-1 code.
    pub language: String,
    pub sensitivity_level: Sensitivity,
    pub confidence_threshold: f64,
    pub max_text_length: usize,
    pub context_window_size: usize,
    /// Default aspect categories when a call passes none.
    pub custom_categories: Vec<String>,
    /// domain name -> lexicon overlay
    pub domain_specific_vocabulary: HashMap<String, Lexicon>,
    pub cache_sentiment_results: bool,
    pub max_cache_size: usize,
    pub batch_processing_enabled: bool,
    pub batch_size: usize,
    /// Cap on concurrent per-item analyses in a batch fan-out (defaults to `batch_size`).
    pub batch_concurrency: Option<usize>,
    /// provider id -> credential; `"ENV"` means read the provider's env var.
    pub api_keys: HashMap<String, String>,

    pub enable_emotion_detection: bool,
    pub enable_aspect_analysis: bool,
    pub enable_context_awareness: bool,
    pub enabled_providers: Vec<ProviderKind>,

    pub request_timeout_secs: u64,
    pub openai_model: String,
    pub openai_base_url: String,
    pub azure_endpoint: String,
    pub azure_region: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_provider: ProviderKind::Local,
            analysis_mode: AnalysisMode::Standard,
            language: "en".to_string(),
            sensitivity_level: Sensitivity::Medium,
            confidence_threshold: 0.6,
            max_text_length: 5000,
            context_window_size: 3,
            custom_categories: Vec::new(),
            domain_specific_vocabulary: HashMap::new(),
            cache_sentiment_results: true,
            max_cache_size: 1000,
            batch_processing_enabled: true,
            batch_size: 10,
            batch_concurrency: None,
            api_keys: HashMap::new(),
            enable_emotion_detection: true,
            enable_aspect_analysis: true,
            enable_context_awareness: true,
            enabled_providers: ProviderKind::ALL.to_vec(),
            request_timeout_secs: 30,
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            azure_endpoint: "https://api.cognitive.microsofttranslator.com".to_string(),
            azure_region: "global".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from an explicit path. `.toml` is parsed as TOML, anything else as JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: EngineConfig = if ext == "toml" {
            toml::from_str(&content).context("parsing TOML engine config")?
        } else {
            serde_json::from_str(&content).context("parsing JSON engine config")?
        };
        Ok(cfg.finish())
    }

    /// Load using env var + fallbacks:
    /// 1) $SENTIMENT_CONFIG_PATH
    /// 2) config/engine.toml
    /// 3) config/engine.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in ["config/engine.toml", "config/engine.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default().finish())
    }

    /// Sanitize ranges and resolve `"ENV"` credentials.
    pub fn finish(mut self) -> Self {
        self.sanitize();
        self.resolve_env_keys();
        self
    }

    fn sanitize(&mut self) {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            self.confidence_threshold = self.confidence_threshold.clamp(0.0, 1.0);
        }
        self.batch_size = self.batch_size.max(1);
        self.context_window_size = self.context_window_size.max(1);
        self.max_text_length = self.max_text_length.max(1);
        self.language = self.language.trim().to_ascii_lowercase();
        if self.language.is_empty() {
            self.language = "en".to_string();
        }
        self.custom_categories.retain(|c| !c.trim().is_empty());
        if self.enabled_providers.is_empty() {
            self.enabled_providers.push(ProviderKind::Local);
        }
        self.enabled_providers.sort();
        self.enabled_providers.dedup();
    }

    fn resolve_env_keys(&mut self) {
        let mut resolved = HashMap::new();
        for (name, value) in self.api_keys.drain() {
            let Ok(kind) = name.parse::<ProviderKind>() else {
                tracing::warn!(provider = %name, "ignoring API key for unknown provider");
                continue;
            };
            let key = if value.trim().eq_ignore_ascii_case("env") {
                match kind.key_env_var().and_then(|var| std::env::var(var).ok()) {
                    Some(v) if !v.trim().is_empty() => v,
                    _ => {
                        tracing::warn!(
                            provider = %kind,
                            "API key set to ENV but variable is missing"
                        );
                        continue;
                    }
                }
            } else {
                value
            };
            resolved.insert(kind.as_str().to_string(), key);
        }
        self.api_keys = resolved;
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        self.api_keys
            .get(kind.as_str())
            .map(String::as_str)
            .filter(|k| !k.trim().is_empty())
    }

    pub fn effective_batch_concurrency(&self) -> usize {
        self.batch_concurrency.unwrap_or(self.batch_size).max(1)
    }
}
