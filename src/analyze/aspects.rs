//! Rule-based aspect extraction, used whenever the active provider has no
//! aspect support of its own.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ResolvedOptions;
use crate::result::{AspectReport, AspectSentiment};
use crate::sentiment;

pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "price",
    "quality",
    "service",
    "performance",
    "design",
    "usability",
];

static RE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("sentence regex"));

/// Sentences ending in `.`, `!` or `?`; the whole text when none match.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let found: Vec<&str> = RE_SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();
    if found.is_empty() {
        vec![text.trim()]
    } else {
        found
    }
}

/// Scores the first sentence mentioning each category (case-insensitive,
/// whole word). Categories never mentioned are left out.
pub fn extract_rule_based(
    text: &str,
    categories: &[String],
    options: &ResolvedOptions,
) -> AspectReport {
    let lexicon = options.lexicon();
    let sentences = split_sentences(text);

    let mut aspects = Vec::new();
    for category in categories {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(category.trim()));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "skipping aspect category");
                continue;
            }
        };
        if let Some(sentence) = sentences.iter().find(|s| re.is_match(s)) {
            let s = sentiment::score_text(sentence, lexicon, options.sensitivity);
            aspects.push(AspectSentiment {
                aspect: category.clone(),
                sentiment: s.label(),
                confidence: s.confidence(),
                text: sentence.to_string(),
            });
        }
    }

    let overall = sentiment::score_text(text, lexicon, options.sensitivity);
    AspectReport {
        text: text.to_string(),
        aspects,
        overall_sentiment: overall.label(),
        provider: "rule-based".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisMode, ProviderKind, Sensitivity};
    use crate::result::SentimentLabel;

    fn opts() -> ResolvedOptions {
        ResolvedOptions {
            provider: ProviderKind::Local,
            mode: AnalysisMode::Standard,
            language: "en".into(),
            domain: None,
            sensitivity: Sensitivity::Medium,
            domain_lexicon: None,
        }
    }

    fn defaults() -> Vec<String> {
        DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_terminators_or_keeps_whole_text() {
        assert_eq!(split_sentences("One. Two! Three?"), vec!["One.", "Two!", "Three?"]);
        assert_eq!(split_sentences("no terminator here"), vec!["no terminator here"]);
    }

    #[test]
    fn first_matching_sentence_wins() {
        let text = "The price is terrible. The service was excellent. Price aside, good.";
        let rep = extract_rule_based(text, &defaults(), &opts());
        assert_eq!(rep.provider, "rule-based");
        let price = rep.aspects.iter().find(|a| a.aspect == "price").unwrap();
        assert_eq!(price.sentiment, SentimentLabel::Negative);
        assert_eq!(price.text, "The price is terrible.");
        let service = rep.aspects.iter().find(|a| a.aspect == "service").unwrap();
        assert_eq!(service.sentiment, SentimentLabel::Positive);
        assert!(rep.aspects.iter().all(|a| a.aspect != "design"));
    }

    #[test]
    fn matches_whole_words_only() {
        let rep = extract_rule_based("Lovely designer shoes.", &defaults(), &opts());
        assert!(rep.aspects.is_empty());
    }

    #[test]
    fn overall_sentiment_scores_whole_text() {
        let rep = extract_rule_based("awful quality, awful service", &defaults(), &opts());
        assert_eq!(rep.overall_sentiment, SentimentLabel::Negative);
        assert_eq!(rep.aspects.len(), 2);
    }

    #[test]
    fn custom_categories_are_escaped() {
        let cats = vec!["c++".to_string()];
        let rep = extract_rule_based("I love C++ tooling.", &cats, &opts());
        // `\b` after '+' never matches before a space, so nothing is found
        // rather than the pattern blowing up.
        assert!(rep.aspects.is_empty());
    }
}
