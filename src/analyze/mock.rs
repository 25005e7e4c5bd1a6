//! Deterministic in-process provider.
//!
//! Stands in for any provider id so tests can count calls and inject
//! failures without network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Provider, ProviderDescriptor, ProviderFamily, ResolvedOptions};
use crate::config::{AnalysisMode, ProviderKind};
use crate::error::{EngineError, Result};
use crate::result::{AnalysisResult, SentimentLabel, SentimentScores};

pub struct MockProvider {
    descriptor: ProviderDescriptor,
    label: SentimentLabel,
    batch: bool,
    configured: bool,
    fail_on: Option<String>,
    calls: AtomicUsize,
    batch_calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                kind,
                "Mock Provider",
                ProviderFamily::LexiconBased,
                &["en", "es", "fr", "de"],
                &[
                    AnalysisMode::Standard,
                    AnalysisMode::Detailed,
                    AnalysisMode::Academic,
                    AnalysisMode::Social,
                ],
                10_000,
            ),
            label: SentimentLabel::Neutral,
            batch: false,
            configured: true,
            fail_on: None,
            calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_label(mut self, label: SentimentLabel) -> Self {
        self.label = label;
        self
    }

    /// Advertise a native batch endpoint.
    pub fn with_batch(mut self) -> Self {
        self.batch = true;
        self
    }

    /// Any text containing `needle` fails with a provider error.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn with_max_text_length(mut self, max: usize) -> Self {
        self.descriptor.max_text_length = max;
        self
    }

    /// Single-text `analyze` invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Every text the provider was handed, in arrival order.
    pub fn seen_texts(&self) -> Vec<String> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn produce(&self, text: &str) -> Result<AnalysisResult> {
        self.seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(text.to_string());
        if let Some(needle) = &self.fail_on {
            if text.contains(needle.as_str()) {
                return Err(EngineError::provider(self.descriptor.id, "mock failure"));
            }
        }
        if !self.configured {
            return Err(EngineError::configuration("mock provider has no credential"));
        }
        let compound = match self.label {
            SentimentLabel::Positive => 0.5,
            SentimentLabel::Negative => -0.5,
            SentimentLabel::Neutral => 0.0,
        };
        let scores = SentimentScores {
            compound,
            ..SentimentScores::default()
        };
        Ok(AnalysisResult::new(text, self.label, scores, 0.8, self.descriptor.id))
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn analyze(&self, text: &str, _options: &ResolvedOptions) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.produce(text)
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }

    async fn batch_analyze(
        &self,
        texts: &[String],
        _options: &ResolvedOptions,
    ) -> Result<Vec<AnalysisResult>> {
        if !self.batch {
            return Err(EngineError::provider(
                self.descriptor.id,
                "batch analysis is not supported",
            ));
        }
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.produce(t)).collect()
    }
}
