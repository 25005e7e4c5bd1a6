//! result.rs: output shapes of the engine.
//!
//! Everything here is plain data: produced once by a provider, stamped by the
//! orchestrator, then treated as immutable. Cached copies are clones with
//! `from_cache` set, never the stored value itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::ProviderKind;
use crate::context::ContextSummary;

/// Boundary of the neutral band: |compound| below this is neutral.
pub const NEUTRAL_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// `>= 0.05` positive, `<= -0.05` negative, neutral in between.
    pub fn from_compound(compound: f64) -> Self {
        if compound >= NEUTRAL_BAND {
            Self::Positive
        } else if compound <= -NEUTRAL_BAND {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// Lenient parse of provider output ("Positive", " negative ").
    /// Labels outside the three classes (e.g. "mixed") yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    /// Always within [-1, 1].
    pub compound: f64,
}

/// Sentiment-bearing tokens as they appeared in the text, grouped by polarity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentWords {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub neutral: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordWeight {
    pub word: String,
    /// Absolute lexicon weight.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexiconDetails {
    pub word_count: usize,
    pub sentiment_bearing_word_count: usize,
    /// (positive + negative hits) / word count
    pub sentiment_ratio: f64,
    /// |compound|
    pub intensity: f64,
    pub top_positive_words: Vec<WordWeight>,
    pub top_negative_words: Vec<WordWeight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceSentiment {
    pub text: String,
    pub sentiment: SentimentLabel,
    pub scores: ClassScores,
}

/// Provider-specific extras, attached only in detailed mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalysisDetails {
    Lexicon(LexiconDetails),
    Sentences { sentences: Vec<SentenceSentiment> },
    Narrative { analysis: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectSentiment {
    pub aspect: String,
    pub sentiment: SentimentLabel,
    pub confidence: f64,
    /// Sentence (or span) the aspect was found in.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub text: String,
    pub sentiment: SentimentLabel,
    pub scores: SentimentScores,
    pub confidence: f64,
    pub provider: ProviderKind,
    pub timestamp_ms: i64,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_words: Option<SentimentWords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AnalysisDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspects: Option<Vec<AspectSentiment>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,
}

impl AnalysisResult {
    /// Bare result as a provider produces it; id and timings are stamped later.
    pub fn new(
        text: impl Into<String>,
        sentiment: SentimentLabel,
        scores: SentimentScores,
        confidence: f64,
        provider: ProviderKind,
    ) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            sentiment,
            scores,
            confidence: confidence.clamp(0.0, 1.0),
            provider,
            timestamp_ms: 0,
            processing_time_ms: 0,
            sentiment_words: None,
            details: None,
            context: None,
            aspects: None,
            from_cache: false,
        }
    }

    /// Copy handed out on a cache hit.
    pub fn cached_copy(&self) -> Self {
        Self {
            from_cache: true,
            ..self.clone()
        }
    }

    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}

/// Plutchik's eight basic emotions, plus `Neutral` for "nothing clear".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Trust,
    Anticipation,
    Neutral,
}

impl Emotion {
    pub const CATEGORIES: [Emotion; 8] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Trust,
        Emotion::Anticipation,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joy" => Some(Self::Joy),
            "sadness" => Some(Self::Sadness),
            "anger" => Some(Self::Anger),
            "fear" => Some(Self::Fear),
            "surprise" => Some(Self::Surprise),
            "disgust" => Some(Self::Disgust),
            "trust" => Some(Self::Trust),
            "anticipation" => Some(Self::Anticipation),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionResult {
    pub text: String,
    pub primary_emotion: Emotion,
    /// One score per category in `Emotion::CATEGORIES`.
    pub emotions: BTreeMap<Emotion, f64>,
    pub intensity: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub emotional_words: BTreeMap<Emotion, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// "lexicon", "openai", "azure", ...
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AspectReport {
    pub text: String,
    pub aspects: Vec<AspectSentiment>,
    pub overall_sentiment: SentimentLabel,
    /// "rule-based", "openai", "azure"
    pub provider: String,
}
