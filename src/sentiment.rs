//! Lexicon scorer: tokenized text + word weights -> raw sentiment masses.
//!
//! Pure functions, no state. Shared by the local provider, the rule-based
//! aspect extractor and (tokenizer only) the emotion lexicon classifier.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::config::Sensitivity;
use crate::lexicon::MergedLexicon;
use crate::result::{LexiconDetails, SentimentLabel, SentimentScores, SentimentWords, WordWeight};

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));
static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").expect("email regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Confidence never reaches certainty for lexicon scoring.
const MAX_CONFIDENCE: f64 = 0.99;

/// Lowercase, drop URLs and e-mail addresses, collapse whitespace.
pub fn preprocess(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_urls = RE_URL.replace_all(&lower, "");
    let no_mails = RE_EMAIL.replace_all(&no_urls, "");
    RE_WS.replace_all(&no_mails, " ").trim().to_string()
}

/// Whitespace tokens of the preprocessed text.
///
/// Leading/trailing punctuation is trimmed ("great!" -> "great", inner
/// apostrophes survive) and single-character tokens are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    preprocess(text)
        .split(' ')
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// Raw output of [`score_text`]. `positive`/`negative` are already scaled by
/// the sensitivity factor.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexiconScore {
    pub positive: f64,
    pub negative: f64,
    /// Number of tokens whose lexicon weight is exactly zero.
    pub neutral: f64,
    pub compound: f64,
    pub word_count: usize,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
    pub neutral_words: Vec<String>,
}

pub fn score_text(
    text: &str,
    lexicon: MergedLexicon<'_>,
    sensitivity: Sensitivity,
) -> LexiconScore {
    let tokens = tokenize(text);
    let mut out = LexiconScore {
        word_count: tokens.len(),
        ..LexiconScore::default()
    };

    for token in tokens {
        let Some(weight) = lexicon.get(&token) else {
            continue;
        };
        if weight > 0.0 {
            out.positive += weight;
            out.positive_words.push(token);
        } else if weight < 0.0 {
            out.negative += weight.abs();
            out.negative_words.push(token);
        } else {
            out.neutral += 1.0;
            out.neutral_words.push(token);
        }
    }

    let factor = sensitivity.factor();
    out.positive *= factor;
    out.negative *= factor;
    out.compound = compound(out.positive, out.negative);
    out
}

/// `(p - n) / (p + n)`, or 0 when there is no polar mass.
pub fn compound(positive: f64, negative: f64) -> f64 {
    let total = positive + negative;
    if total > 0.0 {
        ((positive - negative) / total).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

pub fn confidence_for(compound: f64) -> f64 {
    (compound.abs() + 0.5).min(MAX_CONFIDENCE)
}

impl LexiconScore {
    pub fn label(&self) -> SentimentLabel {
        SentimentLabel::from_compound(self.compound)
    }

    pub fn confidence(&self) -> f64 {
        confidence_for(self.compound)
    }

    pub fn scores(&self) -> SentimentScores {
        SentimentScores {
            positive: self.positive,
            negative: self.negative,
            neutral: self.neutral,
            compound: self.compound,
        }
    }

    pub fn words(&self) -> SentimentWords {
        SentimentWords {
            positive: self.positive_words.clone(),
            negative: self.negative_words.clone(),
            neutral: self.neutral_words.clone(),
        }
    }

    /// Extra numbers for "detailed" mode.
    pub fn details(&self, lexicon: MergedLexicon<'_>, top_n: usize) -> LexiconDetails {
        let bearing =
            self.positive_words.len() + self.negative_words.len() + self.neutral_words.len();
        let polar = self.positive_words.len() + self.negative_words.len();
        LexiconDetails {
            word_count: self.word_count,
            sentiment_bearing_word_count: bearing,
            sentiment_ratio: polar as f64 / self.word_count.max(1) as f64,
            intensity: self.compound.abs(),
            top_positive_words: top_words(&self.positive_words, lexicon, top_n),
            top_negative_words: top_words(&self.negative_words, lexicon, top_n),
        }
    }
}

/// Unique words ordered by absolute weight, highest first (ties keep text order).
pub fn top_words(words: &[String], lexicon: MergedLexicon<'_>, limit: usize) -> Vec<WordWeight> {
    let mut seen = HashSet::new();
    let mut scored: Vec<WordWeight> = words
        .iter()
        .filter(|w| seen.insert(w.as_str()))
        .map(|w| WordWeight {
            word: w.clone(),
            score: lexicon.get(w).unwrap_or(0.0).abs(),
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;
    use rand::Rng;

    fn lex(pairs: &[(&str, f64)]) -> Lexicon {
        pairs.iter().map(|(w, s)| (w.to_string(), *s)).collect()
    }

    #[test]
    fn good_good_bad_matches_worked_example() {
        let l = lex(&[("good", 0.6), ("bad", -0.6)]);
        let s = score_text("good good bad", MergedLexicon::new(&l, None), Sensitivity::Medium);
        assert!((s.positive - 1.2).abs() < 1e-9);
        assert!((s.negative - 0.6).abs() < 1e-9);
        assert!((s.compound - 0.6 / 1.8).abs() < 1e-9);
        assert_eq!(s.label(), SentimentLabel::Positive);
        assert!((s.confidence() - (0.6 / 1.8 + 0.5)).abs() < 1e-9);
        assert_eq!(s.positive_words, vec!["good", "good"]);
    }

    #[test]
    fn sensitivity_scales_masses_not_ratio() {
        let l = lex(&[("good", 0.6), ("bad", -0.6)]);
        let m = MergedLexicon::new(&l, None);
        let low = score_text("good bad good", m, Sensitivity::Low);
        let high = score_text("good bad good", m, Sensitivity::High);
        assert!((low.positive - 1.2 * 0.7).abs() < 1e-9);
        assert!((high.negative - 0.6 * 1.3).abs() < 1e-9);
        assert!((low.compound - high.compound).abs() < 1e-9);
    }

    #[test]
    fn no_polar_words_is_neutral_with_half_confidence() {
        let l = lex(&[("okay", 0.0)]);
        let s = score_text(
            "it was okay I guess",
            MergedLexicon::new(&l, None),
            Sensitivity::Medium,
        );
        assert_eq!(s.compound, 0.0);
        assert_eq!(s.neutral, 1.0);
        assert_eq!(s.label(), SentimentLabel::Neutral);
        assert!((s.confidence() - 0.5).abs() < 1e-9);
        assert_eq!(s.word_count, 4); // "I" is dropped
    }

    #[test]
    fn confidence_is_capped() {
        assert!((confidence_for(1.0) - 0.99).abs() < 1e-9);
        assert!((confidence_for(-0.2) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn preprocess_strips_urls_and_emails() {
        let p = preprocess("Great   deal at https://shop.example/x?y=1 mail ME@Example.com  NOW");
        assert_eq!(p, "great deal at mail now");
    }

    #[test]
    fn tokens_lose_edge_punctuation() {
        assert_eq!(
            tokenize("Great!! (really) don't... a"),
            vec!["great", "really", "don't"]
        );
        assert_eq!(tokenize("I am happy and joyful today").len(), 5);
    }

    #[test]
    fn domain_overlay_wins() {
        let base = lex(&[("sick", -0.7)]);
        let overlay = lex(&[("sick", 0.8)]);
        let s = score_text(
            "that trick was sick",
            MergedLexicon::new(&base, Some(&overlay)),
            Sensitivity::Medium,
        );
        assert_eq!(s.label(), SentimentLabel::Positive);
    }

    #[test]
    fn top_words_are_unique_and_ordered() {
        let l = lex(&[("good", 0.6), ("excellent", 0.9), ("nice", 0.5)]);
        let words: Vec<String> = ["good", "nice", "excellent", "good"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let top = top_words(&words, MergedLexicon::new(&l, None), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].word, "excellent");
        assert_eq!(top[1].word, "good");
    }

    #[test]
    fn appending_polar_tokens_is_monotone() {
        let l = lex(&[
            ("good", 0.6),
            ("great", 0.8),
            ("bad", -0.6),
            ("awful", -0.8),
            ("meh", 0.0),
            ("table", 0.0),
        ]);
        let m = MergedLexicon::new(&l, None);
        let vocab = ["good", "great", "bad", "awful", "meh", "table", "chair"];
        let mut rng = rand::rng();

        for _ in 0..200 {
            let len = rng.random_range(0..8);
            let base: Vec<&str> = (0..len)
                .map(|_| vocab[rng.random_range(0..vocab.len())])
                .collect();
            let text = base.join(" ");
            let before = score_text(&text, m, Sensitivity::Medium).compound;

            let pos = score_text(&format!("{text} great"), m, Sensitivity::Medium).compound;
            assert!(pos >= before - 1e-12, "positive token lowered compound for '{text}'");

            let neg = score_text(&format!("{text} awful"), m, Sensitivity::Medium).compound;
            assert!(neg <= before + 1e-12, "negative token raised compound for '{text}'");
        }
    }
}
