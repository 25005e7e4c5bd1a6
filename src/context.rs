//! context.rs: bounded history of recent analyses and the "mood" derived from it.
//!
//! The list may grow to `2 × window`; crossing that bound trims it back to the
//! most recent `window` entries in one step.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::result::SentimentLabel;

/// Characters of the analyzed text kept per entry.
pub const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub text_preview: String,
    pub sentiment: SentimentLabel,
    pub timestamp_ms: i64,
}

/// Informational snapshot attached to a fresh result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub entries: Vec<ContextEntry>,
    pub overall_sentiment: SentimentLabel,
}

/// Payload of the `onContextUpdate` event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    pub context_size: usize,
    pub recent_sentiment: SentimentLabel,
    pub overall_sentiment: SentimentLabel,
}

#[derive(Debug)]
pub struct ContextTracker {
    inner: Mutex<VecDeque<ContextEntry>>,
    window: usize,
}

impl ContextTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(window * 2 + 1)),
            window,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Summary over the last `window` entries, `None` while the history is empty.
    pub fn summary(&self) -> Option<ContextSummary> {
        let v = self.lock();
        if v.is_empty() {
            return None;
        }
        let start = v.len().saturating_sub(self.window);
        let entries: Vec<ContextEntry> = v.iter().skip(start).cloned().collect();
        let overall_sentiment = majority(entries.iter().map(|e| e.sentiment));
        Some(ContextSummary {
            entries,
            overall_sentiment,
        })
    }

    /// Append an entry, trimming per the 2× rule; returns the update event payload.
    pub fn record(
        &self,
        text: &str,
        sentiment: SentimentLabel,
        timestamp_ms: i64,
    ) -> ContextUpdate {
        let entry = ContextEntry {
            text_preview: text.chars().take(PREVIEW_CHARS).collect(),
            sentiment,
            timestamp_ms,
        };

        let mut v = self.lock();
        v.push_back(entry);
        if v.len() > self.window * 2 {
            let excess = v.len() - self.window;
            v.drain(0..excess);
            tracing::debug!(kept = v.len(), "context history trimmed");
        }

        ContextUpdate {
            context_size: v.len(),
            recent_sentiment: sentiment,
            overall_sentiment: majority(v.iter().map(|e| e.sentiment)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Most recent `limit` entries, oldest first; `0` returns everything.
    pub fn history(&self, limit: usize) -> Vec<ContextEntry> {
        let v = self.lock();
        let start = if limit == 0 {
            0
        } else {
            v.len().saturating_sub(limit)
        };
        v.iter().skip(start).cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ContextEntry>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Strict majority of positive/negative; anything else (ties included) is neutral.
pub fn majority(labels: impl Iterator<Item = SentimentLabel>) -> SentimentLabel {
    let (mut pos, mut neg, mut neu) = (0usize, 0usize, 0usize);
    for l in labels {
        match l {
            SentimentLabel::Positive => pos += 1,
            SentimentLabel::Negative => neg += 1,
            SentimentLabel::Neutral => neu += 1,
        }
    }
    if pos > neg && pos > neu {
        SentimentLabel::Positive
    } else if neg > pos && neg > neu {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SentimentLabel::*;

    #[test]
    fn trims_to_window_after_exceeding_twice_the_window() {
        let t = ContextTracker::new(3);
        for i in 0..6 {
            t.record(&format!("msg {i}"), Positive, i);
        }
        assert_eq!(t.len(), 6);
        let upd = t.record("msg 6", Negative, 6);
        assert_eq!(upd.context_size, 3);
        assert_eq!(t.len(), 3);
        let hist = t.history(0);
        assert_eq!(hist[0].text_preview, "msg 4");
        assert_eq!(hist[2].text_preview, "msg 6");
    }

    #[test]
    fn summary_covers_last_window_only() {
        let t = ContextTracker::new(2);
        assert!(t.summary().is_none());
        t.record("a", Negative, 1);
        t.record("b", Positive, 2);
        t.record("c", Positive, 3);
        let s = t.summary().unwrap();
        assert_eq!(s.entries.len(), 2);
        assert_eq!(s.overall_sentiment, Positive);
    }

    #[test]
    fn ties_resolve_to_neutral() {
        assert_eq!(majority([Positive, Negative].into_iter()), Neutral);
        assert_eq!(majority([Positive, Positive, Neutral, Neutral].into_iter()), Neutral);
        assert_eq!(majority([Negative, Negative, Positive].into_iter()), Negative);
        assert_eq!(majority(std::iter::empty()), Neutral);
    }

    #[test]
    fn preview_is_capped_in_chars() {
        let t = ContextTracker::new(1);
        let long = "é".repeat(500);
        t.record(&long, Neutral, 0);
        assert_eq!(t.history(1)[0].text_preview.chars().count(), PREVIEW_CHARS);
    }
}
