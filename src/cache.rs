//! Bounded, insertion-ordered result cache.
//!
//! Keys are SHA-256 digests over the text and the option tuple that can change
//! a result. All mutation goes through one mutex per cache, so concurrent
//! batch fan-outs cannot corrupt the eviction order.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::sync::Mutex;

use crate::config::{AnalysisMode, ProviderKind};
use crate::result::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Each field is length-prefixed before hashing, so no two distinct
    /// tuples share an input byte stream.
    pub fn new(
        text: &str,
        provider: ProviderKind,
        language: &str,
        mode: AnalysisMode,
        domain: Option<&str>,
    ) -> Self {
        let mut hasher = Sha256::new();
        for field in [
            text,
            provider.as_str(),
            language,
            mode.as_str(),
            domain.unwrap_or(""),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update([domain.is_some() as u8]);

        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for b in digest {
            let _ = write!(hex, "{b:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<CacheKey, AnalysisResult>,
    order: VecDeque<CacheKey>,
}

#[derive(Debug)]
pub struct ResultCache {
    inner: Mutex<Inner>,
    max_size: usize,
}

impl ResultCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Size the cache shrinks to once it overflows: ⌈max × 0.75⌉.
    pub fn size_after_eviction(&self) -> usize {
        (self.max_size * 3).div_ceil(4)
    }

    /// Hit returns a copy flagged `from_cache`.
    pub fn get(&self, key: &CacheKey) -> Option<AnalysisResult> {
        self.lock().map.get(key).map(AnalysisResult::cached_copy)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().map.contains_key(key)
    }

    /// Insert (or replace in place, keeping the original insertion slot) and
    /// evict oldest-first on overflow. Returns the number of evicted entries.
    pub fn insert(&self, key: CacheKey, mut result: AnalysisResult) -> usize {
        result.from_cache = false;
        let mut inner = self.lock();
        if inner.map.insert(key.clone(), result).is_none() {
            inner.order.push_back(key);
        }

        if inner.map.len() <= self.max_size {
            return 0;
        }
        let target = self.size_after_eviction();
        let mut evicted = 0;
        while inner.map.len() > target {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
            evicted += 1;
        }
        tracing::debug!(evicted, remaining = inner.map.len(), "result cache trimmed");
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{SentimentLabel, SentimentScores};

    fn key(text: &str) -> CacheKey {
        CacheKey::new(text, ProviderKind::Local, "en", AnalysisMode::Standard, None)
    }

    fn result(text: &str) -> AnalysisResult {
        AnalysisResult::new(
            text,
            SentimentLabel::Neutral,
            SentimentScores::default(),
            0.5,
            ProviderKind::Local,
        )
    }

    #[test]
    fn key_depends_on_every_option() {
        let base = key("hello");
        assert_eq!(base, key("hello"));
        assert_ne!(base, key("hello!"));
        assert_ne!(
            base,
            CacheKey::new("hello", ProviderKind::Azure, "en", AnalysisMode::Standard, None)
        );
        assert_ne!(
            base,
            CacheKey::new("hello", ProviderKind::Local, "de", AnalysisMode::Standard, None)
        );
        assert_ne!(
            base,
            CacheKey::new("hello", ProviderKind::Local, "en", AnalysisMode::Detailed, None)
        );
        assert_ne!(
            base,
            CacheKey::new("hello", ProviderKind::Local, "en", AnalysisMode::Standard, Some(""))
        );
        assert_eq!(base.as_str().len(), 64);
    }

    #[test]
    fn length_prefix_prevents_field_shifting() {
        let a = CacheKey::new("ab", ProviderKind::Local, "c", AnalysisMode::Standard, None);
        let b = CacheKey::new("a", ProviderKind::Local, "bc", AnalysisMode::Standard, None);
        assert_ne!(a, b);
    }

    #[test]
    fn overflow_shrinks_to_three_quarters_oldest_first() {
        let cache = ResultCache::new(4);
        for i in 0..4 {
            assert_eq!(cache.insert(key(&format!("t{i}")), result("x")), 0);
        }
        let evicted = cache.insert(key("t4"), result("x"));
        assert_eq!(evicted, 2);
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains(&key("t0")));
        assert!(!cache.contains(&key("t1")));
        assert!(cache.contains(&key("t4")));
    }

    #[test]
    fn max_plus_one_leaves_ceil_of_75_percent() {
        for max in [1usize, 2, 3, 10, 13] {
            let cache = ResultCache::new(max);
            for i in 0..=max {
                cache.insert(key(&format!("k{i}")), result("x"));
            }
            assert_eq!(cache.len(), (max * 3).div_ceil(4), "max={max}");
            assert!(!cache.contains(&key("k0")), "max={max}");
        }
    }

    #[test]
    fn hit_is_flagged_and_store_is_untouched() {
        let cache = ResultCache::new(10);
        cache.insert(key("a"), result("a"));
        let hit = cache.get(&key("a")).unwrap();
        assert!(hit.from_cache);
        let again = cache.get(&key("a")).unwrap();
        assert_eq!(hit, again);
    }

    #[test]
    fn replacing_a_key_keeps_its_slot() {
        let cache = ResultCache::new(2);
        cache.insert(key("a"), result("a"));
        cache.insert(key("b"), result("b"));
        cache.insert(key("a"), result("a2"));
        assert_eq!(cache.len(), 2);
        cache.insert(key("c"), result("c"));
        // ceil(2 * 0.75) = 2, "a" was oldest
        assert!(!cache.contains(&key("a")));
        assert!(cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
    }
}
