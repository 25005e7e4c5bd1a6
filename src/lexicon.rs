//! Bundled lexicons.
//!
//! `sentiment_lexicon.json` maps language -> word -> signed weight,
//! `emotion_lexicon.json` maps language -> word -> emotion category.
//! Languages without a table fall back to English.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::result::Emotion;

/// word -> signed sentiment weight
pub type Lexicon = HashMap<String, f64>;

/// word -> emotion category
pub type EmotionLexicon = HashMap<String, Emotion>;

pub const FALLBACK_LANGUAGE: &str = "en";

static SENTIMENT: Lazy<HashMap<String, Lexicon>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, Lexicon>>(raw).expect("valid sentiment lexicon")
});

static EMOTION: Lazy<HashMap<String, EmotionLexicon>> = Lazy::new(|| {
    let raw = include_str!("../emotion_lexicon.json");
    serde_json::from_str::<HashMap<String, EmotionLexicon>>(raw).expect("valid emotion lexicon")
});

/// Default sentiment table for `language`.
pub fn sentiment_lexicon(language: &str) -> &'static Lexicon {
    SENTIMENT
        .get(language)
        .or_else(|| SENTIMENT.get(FALLBACK_LANGUAGE))
        .expect("bundled lexicon has an English table")
}

pub fn emotion_lexicon(language: &str) -> &'static EmotionLexicon {
    EMOTION
        .get(language)
        .or_else(|| EMOTION.get(FALLBACK_LANGUAGE))
        .expect("bundled emotion lexicon has an English table")
}

/// Two-level lookup: the domain overlay wins over the base table.
#[derive(Debug, Clone, Copy)]
pub struct MergedLexicon<'a> {
    base: &'a Lexicon,
    overlay: Option<&'a Lexicon>,
}

impl<'a> MergedLexicon<'a> {
    pub fn new(base: &'a Lexicon, overlay: Option<&'a Lexicon>) -> Self {
        Self { base, overlay }
    }

    pub fn get(&self, word: &str) -> Option<f64> {
        self.overlay
            .and_then(|o| o.get(word))
            .or_else(|| self.base.get(word))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_load() {
        assert!((sentiment_lexicon("en")["excellent"] - 0.9).abs() < 1e-9);
        assert!((sentiment_lexicon("de")["schlecht"] + 0.6).abs() < 1e-9);
        assert_eq!(emotion_lexicon("en")["joyful"], Emotion::Joy);
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        assert!(sentiment_lexicon("pt").contains_key("good"));
        assert!(emotion_lexicon("fr").contains_key("happy"));
    }

    #[test]
    fn overlay_takes_precedence() {
        let mut overlay = Lexicon::new();
        overlay.insert("bad".to_string(), 0.4); // "bad" as in "so bad it's good"
        let merged = MergedLexicon::new(sentiment_lexicon("en"), Some(&overlay));
        assert_eq!(merged.get("bad"), Some(0.4));
        assert_eq!(merged.get("good"), Some(0.6));
        assert_eq!(merged.get("zebra"), None);
    }
}
