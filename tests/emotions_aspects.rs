// tests/emotions_aspects.rs
//
// Emotion detection and aspect-based analysis through the engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chat_sentiment_engine::analyze::emotion::EmotionClassifier;
use chat_sentiment_engine::analyze::{MockProvider, ResolvedOptions};
use chat_sentiment_engine::{
    AnalysisOptions, Emotion, EmotionResult, EngineConfig, EngineError, EventKind, ProviderKind,
    SentimentEngine, SentimentLabel,
};

fn local_cfg() -> EngineConfig {
    EngineConfig {
        enabled_providers: vec![ProviderKind::Local],
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn lexicon_emotions_and_event() {
    let engine = SentimentEngine::new(local_cfg()).unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    engine.on(
        EventKind::EmotionDetected,
        Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let r = engine
        .detect_emotions("I am happy and joyful today", &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(r.primary_emotion, Emotion::Joy);
    assert!((r.emotions[&Emotion::Joy] - 0.4).abs() < 1e-9);
    assert!((r.intensity - 0.4).abs() < 1e-9);
    assert_eq!(r.provider, "lexicon");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unconfigured_remote_falls_back_to_lexicon_classifier() {
    // Remote providers registered but without credentials.
    let cfg = EngineConfig {
        analysis_provider: ProviderKind::Azure,
        ..EngineConfig::default()
    };
    let engine = SentimentEngine::new(cfg).unwrap();
    let r = engine
        .detect_emotions("so scared and worried", &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(r.provider, "lexicon");
    assert_eq!(r.primary_emotion, Emotion::Fear);
}

struct FixedClassifier {
    configured: bool,
}

#[async_trait]
impl EmotionClassifier for FixedClassifier {
    fn name(&self) -> &str {
        "fixed"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn detect(
        &self,
        text: &str,
        _options: &ResolvedOptions,
    ) -> chat_sentiment_engine::Result<EmotionResult> {
        Ok(EmotionResult {
            text: text.to_string(),
            primary_emotion: Emotion::Surprise,
            emotions: Emotion::CATEGORIES.iter().map(|e| (*e, 0.1)).collect(),
            intensity: 0.1,
            emotional_words: Default::default(),
            explanation: None,
            provider: "fixed".into(),
        })
    }
}

#[tokio::test]
async fn provider_classifier_wins_only_when_configured() {
    let engine = SentimentEngine::builder(local_cfg())
        .emotion_classifier(ProviderKind::Local, Arc::new(FixedClassifier { configured: true }))
        .build()
        .unwrap();
    let r = engine
        .detect_emotions("happy", &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(r.provider, "fixed");

    let engine = SentimentEngine::builder(local_cfg())
        .emotion_classifier(ProviderKind::Local, Arc::new(FixedClassifier { configured: false }))
        .build()
        .unwrap();
    let r = engine
        .detect_emotions("happy", &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(r.provider, "lexicon");
}

#[tokio::test]
async fn disabled_features_are_validation_errors() {
    let cfg = EngineConfig {
        enable_emotion_detection: false,
        enable_aspect_analysis: false,
        ..local_cfg()
    };
    let engine = SentimentEngine::new(cfg).unwrap();
    let opts = AnalysisOptions::default();
    assert!(matches!(
        engine.detect_emotions("happy", &opts).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.analyze_aspects("nice price", &[], &opts).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn rule_based_aspects_with_default_categories() {
    let engine = SentimentEngine::new(local_cfg()).unwrap();
    let report = engine
        .analyze_aspects(
            "The price is terrible. The design is fantastic!",
            &[],
            &AnalysisOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(report.provider, "rule-based");
    assert_eq!(report.aspects.len(), 2);
    let price = report.aspects.iter().find(|a| a.aspect == "price").unwrap();
    assert_eq!(price.sentiment, SentimentLabel::Negative);
    let design = report.aspects.iter().find(|a| a.aspect == "design").unwrap();
    assert_eq!(design.sentiment, SentimentLabel::Positive);
    assert_eq!(design.text, "The design is fantastic!");
}

#[tokio::test]
async fn custom_categories_replace_defaults_and_callers_override_both() {
    let cfg = EngineConfig {
        custom_categories: vec!["battery".into()],
        ..local_cfg()
    };
    let engine = SentimentEngine::new(cfg).unwrap();
    let text = "Battery life is poor. Price is great.";

    let report = engine
        .analyze_aspects(text, &[], &AnalysisOptions::default())
        .await
        .unwrap();
    let names: Vec<&str> = report.aspects.iter().map(|a| a.aspect.as_str()).collect();
    assert_eq!(names, vec!["battery"]);

    let report = engine
        .analyze_aspects(text, &["price".to_string()], &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(report.aspects.len(), 1);
    assert_eq!(report.aspects[0].aspect, "price");
    assert_eq!(report.aspects[0].sentiment, SentimentLabel::Positive);
}

#[tokio::test]
async fn remote_provider_without_key_uses_rule_based_aspects() {
    let cfg = EngineConfig {
        analysis_provider: ProviderKind::OpenAi,
        ..EngineConfig::default()
    };
    let engine = SentimentEngine::new(cfg).unwrap();
    let report = engine
        .analyze_aspects("Service was awful.", &[], &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(report.provider, "rule-based");
    assert_eq!(report.overall_sentiment, SentimentLabel::Negative);
}

#[tokio::test]
async fn mock_provider_has_no_aspect_support() {
    let engine = SentimentEngine::builder(local_cfg())
        .provider(Arc::new(MockProvider::new(ProviderKind::Local)))
        .build()
        .unwrap();
    let report = engine
        .analyze_aspects("Great quality.", &[], &AnalysisOptions::default())
        .await
        .unwrap();
    assert_eq!(report.provider, "rule-based");
    assert_eq!(report.aspects[0].aspect, "quality");
}
