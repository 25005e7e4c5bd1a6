//! Emotion classifiers: one lexicon-based, plus provider-backed variants that
//! the engine prefers when their provider is active and has a credential.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{AzureProvider, OpenAiProvider, Provider, ResolvedOptions};
use crate::config::AnalysisMode;
use crate::error::Result;
use crate::lexicon;
use crate::result::{Emotion, EmotionResult};
use crate::sentiment;

/// Below this the text is considered emotionally flat.
pub const PRIMARY_THRESHOLD: f64 = 0.05;

#[async_trait]
pub trait EmotionClassifier: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool {
        true
    }

    async fn detect(&self, text: &str, options: &ResolvedOptions) -> Result<EmotionResult>;
}

pub type DynEmotionClassifier = Arc<dyn EmotionClassifier>;

/// First category (in `Emotion::CATEGORIES` order) with the strictly highest
/// score; `Neutral` when that score is under [`PRIMARY_THRESHOLD`].
pub fn primary_emotion(scores: &BTreeMap<Emotion, f64>) -> (Emotion, f64) {
    let mut best = (Emotion::Neutral, 0.0);
    for cat in Emotion::CATEGORIES {
        let s = scores.get(&cat).copied().unwrap_or(0.0);
        if s > best.1 {
            best = (cat, s);
        }
    }
    if best.1 < PRIMARY_THRESHOLD {
        (Emotion::Neutral, best.1)
    } else {
        best
    }
}

fn zeroed() -> BTreeMap<Emotion, f64> {
    Emotion::CATEGORIES.iter().map(|e| (*e, 0.0)).collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconEmotionClassifier;

#[async_trait]
impl EmotionClassifier for LexiconEmotionClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn detect(&self, text: &str, options: &ResolvedOptions) -> Result<EmotionResult> {
        Ok(classify_with_lexicon(text, &options.language))
    }
}

/// Token counts per category, normalized by the total token count.
pub fn classify_with_lexicon(text: &str, language: &str) -> EmotionResult {
    let table = lexicon::emotion_lexicon(language);
    let tokens = sentiment::tokenize(text);

    let mut emotions = zeroed();
    let mut words: BTreeMap<Emotion, Vec<String>> = BTreeMap::new();
    for token in &tokens {
        if let Some(cat) = table.get(token) {
            *emotions.entry(*cat).or_insert(0.0) += 1.0;
            words.entry(*cat).or_default().push(token.clone());
        }
    }
    if !tokens.is_empty() {
        let total = tokens.len() as f64;
        for v in emotions.values_mut() {
            *v /= total;
        }
    }

    let (primary_emotion, intensity) = primary_emotion(&emotions);
    EmotionResult {
        text: text.to_string(),
        primary_emotion,
        emotions,
        intensity,
        emotional_words: words,
        explanation: None,
        provider: "lexicon".to_string(),
    }
}

/// Asks the chat model for an emotion breakdown.
pub struct OpenAiEmotionClassifier {
    provider: Arc<OpenAiProvider>,
}

impl OpenAiEmotionClassifier {
    pub fn new(provider: Arc<OpenAiProvider>) -> Self {
        Self { provider }
    }
}

pub(crate) fn emotion_prompt(mode: AnalysisMode) -> String {
    let task = if mode == AnalysisMode::Detailed {
        "Analyze the text for emotions with detailed explanations of emotional cues."
    } else {
        "Identify the emotions expressed in the text."
    };
    format!(
        "You are an emotion analysis expert. {task} Return JSON with the following structure: \
         {{ \"primaryEmotion\": string, \"emotions\": {{ \"joy\": number, \"sadness\": number, \
         \"anger\": number, \"fear\": number, \"surprise\": number, \"disgust\": number, \
         \"trust\": number, \"anticipation\": number }}, \"intensity\": number, \"explanation\": string }}"
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmotionReply {
    primary_emotion: Option<String>,
    #[serde(default)]
    emotions: BTreeMap<String, f64>,
    intensity: Option<f64>,
    explanation: Option<String>,
}

impl EmotionReply {
    fn into_result(self, text: &str) -> EmotionResult {
        let mut emotions = zeroed();
        for (name, score) in self.emotions {
            match Emotion::parse(&name) {
                Some(Emotion::Neutral) | None => {
                    tracing::debug!(emotion = %name, "ignoring unknown emotion from model");
                }
                Some(e) => {
                    emotions.insert(e, score.clamp(0.0, 1.0));
                }
            }
        }
        let (fallback_primary, max) = primary_emotion(&emotions);
        EmotionResult {
            text: text.to_string(),
            primary_emotion: self
                .primary_emotion
                .as_deref()
                .and_then(Emotion::parse)
                .unwrap_or(fallback_primary),
            emotions,
            intensity: self.intensity.unwrap_or(max).clamp(0.0, 1.0),
            emotional_words: BTreeMap::new(),
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            provider: "openai".to_string(),
        }
    }
}

#[async_trait]
impl EmotionClassifier for OpenAiEmotionClassifier {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    async fn detect(&self, text: &str, options: &ResolvedOptions) -> Result<EmotionResult> {
        let reply: EmotionReply = self
            .provider
            .chat_json(&emotion_prompt(options.mode), text)
            .await?;
        Ok(reply.into_result(text))
    }
}

/// Derives emotions from text-analytics sentiment probabilities.
pub struct AzureEmotionMapper {
    provider: Arc<AzureProvider>,
}

impl AzureEmotionMapper {
    pub fn new(provider: Arc<AzureProvider>) -> Self {
        Self { provider }
    }
}

/// Fixed linear map from (positive, negative, neutral) to the eight categories.
pub fn emotions_from_sentiment(
    positive: f64,
    negative: f64,
    neutral: f64,
) -> BTreeMap<Emotion, f64> {
    BTreeMap::from([
        (Emotion::Joy, positive * 0.8),
        (Emotion::Sadness, negative * 0.6),
        (Emotion::Anger, negative * 0.4),
        (Emotion::Fear, negative * 0.3),
        (Emotion::Surprise, neutral * 0.5),
        (Emotion::Disgust, negative * 0.2),
        (Emotion::Trust, positive * 0.5),
        (Emotion::Anticipation, neutral * 0.4),
    ])
}

#[async_trait]
impl EmotionClassifier for AzureEmotionMapper {
    fn name(&self) -> &str {
        "azure"
    }

    fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    async fn detect(&self, text: &str, options: &ResolvedOptions) -> Result<EmotionResult> {
        let d = self.provider.descriptor();
        if !d.supports_language(&options.language) || !d.supports_mode(options.mode) {
            return Ok(classify_with_lexicon(text, &options.language));
        }
        let r = self.provider.analyze(text, options).await?;
        let emotions =
            emotions_from_sentiment(r.scores.positive, r.scores.negative, r.scores.neutral);
        let (primary_emotion, intensity) = primary_emotion(&emotions);
        Ok(EmotionResult {
            text: text.to_string(),
            primary_emotion,
            emotions,
            intensity,
            emotional_words: BTreeMap::new(),
            explanation: None,
            provider: "azure".to_string(),
        })
    }
}
