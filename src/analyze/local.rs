//! Local lexicon provider: wraps the scorer, no I/O.

use async_trait::async_trait;

use super::{Provider, ProviderDescriptor, ProviderFamily, ResolvedOptions};
use crate::config::{AnalysisMode, ProviderKind};
use crate::error::Result;
use crate::result::{AnalysisDetails, AnalysisResult};
use crate::sentiment;

/// Words reported per polarity in detailed mode.
const TOP_WORDS: usize = 5;

pub struct LocalProvider {
    descriptor: ProviderDescriptor,
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProvider {
    pub fn new() -> Self {
        Self {
            descriptor: ProviderDescriptor::new(
                ProviderKind::Local,
                "Local Lexicon Analyzer",
                ProviderFamily::LexiconBased,
                &["en", "es", "fr", "de", "it", "pt", "nl"],
                &[AnalysisMode::Standard, AnalysisMode::Detailed],
                10_000,
            ),
        }
    }

    fn score(&self, text: &str, options: &ResolvedOptions) -> AnalysisResult {
        let lexicon = options.lexicon();
        let s = sentiment::score_text(text, lexicon, options.sensitivity);
        let mut result = AnalysisResult::new(
            text,
            s.label(),
            s.scores(),
            s.confidence(),
            ProviderKind::Local,
        );
        result.sentiment_words = Some(s.words());
        if options.is_detailed() {
            result.details = Some(AnalysisDetails::Lexicon(s.details(lexicon, TOP_WORDS)));
        }
        result
    }
}

#[async_trait]
impl Provider for LocalProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn analyze(&self, text: &str, options: &ResolvedOptions) -> Result<AnalysisResult> {
        Ok(self.score(text, options))
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn batch_analyze(
        &self,
        texts: &[String],
        options: &ResolvedOptions,
    ) -> Result<Vec<AnalysisResult>> {
        Ok(texts.iter().map(|t| self.score(t, options)).collect())
    }
}
