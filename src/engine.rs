//! # Analysis Orchestrator
//! The public entry point: cache lookup → provider dispatch → context update →
//! listener notification, plus batch partitioning and the engine lifecycle.
//!
//! All shared state (cache, context, listeners, domain overlays) is owned by
//! one `SentimentEngine` value; nothing here is process-global. Locks are
//! never held across an `.await`.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analyze::aspects::{self, DEFAULT_CATEGORIES};
use crate::analyze::emotion::{
    AzureEmotionMapper, DynEmotionClassifier, OpenAiEmotionClassifier,
};
use crate::analyze::{
    AnalysisOptions, AzureProvider, DynProvider, EmotionClassifier, LexiconEmotionClassifier,
    LocalProvider, OpenAiProvider, ProviderInfo, ResolvedOptions,
};
use crate::cache::ResultCache;
use crate::config::{AnalysisMode, Credentials, EngineConfig, ProviderKind};
use crate::context::{ContextEntry, ContextTracker};
use crate::error::{EngineError, Result};
use crate::events::{
    AnalysisFailure, EngineEvent, EventKind, Listener, ListenerRef, ListenerRegistry,
};
use crate::lexicon::Lexicon;
use crate::result::{AnalysisResult, AspectReport, EmotionResult};

/// Shown instead of credentials by `configuration()`.
const REDACTED: &str = "********";

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn new_analysis_id() -> String {
    format!("analysis_{}", Uuid::new_v4().simple())
}

/// Character-based truncation; returns the input unchanged when it fits.
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            debug!(max_chars, "input text truncated");
            text[..byte_idx].to_string()
        }
        None => text.to_string(),
    }
}

/// Snapshot returned by [`SentimentEngine::statistics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub initialized: bool,
    pub provider: ProviderKind,
    pub mode: AnalysisMode,
    pub language: String,
    pub registered_providers: Vec<ProviderKind>,
    pub cache_size: usize,
    pub max_cache_size: usize,
    pub context_size: usize,
    pub context_window_size: usize,
    pub domain_vocabularies: usize,
    pub listeners: usize,
    pub total_analyses: u64,
    pub cache_hits: u64,
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    analyses: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
}

/// Everything one call needs, resolved up front so no lock outlives it.
struct CallPlan {
    provider: DynProvider,
    options: ResolvedOptions,
    max_chars: usize,
    cache: bool,
    context: bool,
}

pub struct EngineBuilder {
    config: EngineConfig,
    providers: BTreeMap<ProviderKind, DynProvider>,
    classifiers: HashMap<ProviderKind, DynEmotionClassifier>,
}

impl EngineBuilder {
    /// Register (or replace) the provider for its descriptor id.
    pub fn provider(mut self, provider: DynProvider) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    /// Emotion classifier used while `kind` is the active provider.
    pub fn emotion_classifier(
        mut self,
        kind: ProviderKind,
        classifier: DynEmotionClassifier,
    ) -> Self {
        self.classifiers.insert(kind, classifier);
        self
    }

    /// Fills in the built-in provider for every enabled id that was not
    /// registered explicitly, then checks the default provider exists.
    pub fn build(mut self) -> Result<SentimentEngine> {
        let config = self.config.finish();
        let credentials = Credentials::from_config(&config);

        for kind in config.enabled_providers.clone() {
            if self.providers.contains_key(&kind) {
                continue;
            }
            match kind {
                ProviderKind::Local => {
                    self.providers.insert(kind, Arc::new(LocalProvider::new()));
                }
                ProviderKind::OpenAi => {
                    let p = Arc::new(OpenAiProvider::new(&config, credentials.clone())?);
                    self.classifiers
                        .entry(kind)
                        .or_insert_with(|| Arc::new(OpenAiEmotionClassifier::new(p.clone())));
                    self.providers.insert(kind, p);
                }
                ProviderKind::Azure => {
                    let p = Arc::new(AzureProvider::new(&config, credentials.clone())?);
                    self.classifiers
                        .entry(kind)
                        .or_insert_with(|| Arc::new(AzureEmotionMapper::new(p.clone())));
                    self.providers.insert(kind, p);
                }
            }
        }

        if !self.providers.contains_key(&config.analysis_provider) {
            return Err(EngineError::configuration(format!(
                "default provider '{}' is not registered",
                config.analysis_provider
            )));
        }

        let domains = config
            .domain_specific_vocabulary
            .iter()
            .map(|(name, lex)| (name.clone(), Arc::new(lex.clone())))
            .collect::<HashMap<_, _>>();
        for (name, lex) in &domains {
            info!(domain = %name, terms = lex.len(), "domain vocabulary loaded");
        }

        info!(
            provider = %config.analysis_provider,
            providers = self.providers.len(),
            cache = config.cache_sentiment_results,
            "sentiment engine initialized"
        );

        Ok(SentimentEngine {
            cache: ResultCache::new(config.max_cache_size),
            context: ContextTracker::new(config.context_window_size),
            settings: RwLock::new(config),
            credentials,
            providers: self.providers,
            classifiers: self.classifiers,
            domains: RwLock::new(domains),
            listeners: ListenerRegistry::default(),
            initialized: AtomicBool::new(true),
            counters: Counters::default(),
        })
    }
}

pub struct SentimentEngine {
    settings: RwLock<EngineConfig>,
    credentials: Credentials,
    providers: BTreeMap<ProviderKind, DynProvider>,
    classifiers: HashMap<ProviderKind, DynEmotionClassifier>,
    domains: RwLock<HashMap<String, Arc<Lexicon>>>,
    cache: ResultCache,
    context: ContextTracker,
    listeners: ListenerRegistry,
    initialized: AtomicBool,
    counters: Counters,
}

impl SentimentEngine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            providers: BTreeMap::new(),
            classifiers: HashMap::new(),
        }
    }

    /// Engine with the built-in providers for `config.enabled_providers`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    // ---------------------------------------------------------------------
    // Analysis entry points
    // ---------------------------------------------------------------------

    pub async fn analyze_sentiment(
        &self,
        text: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult> {
        self.ensure_ready()?;
        if text.trim().is_empty() {
            return Err(EngineError::validation("no text provided for analysis"));
        }

        let id = new_analysis_id();
        match self.analyze_one(&id, text, options).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.report_failure(&id, text, &e);
                Err(e)
            }
        }
    }

    async fn analyze_one(
        &self,
        id: &str,
        text: &str,
        options: &AnalysisOptions,
    ) -> Result<AnalysisResult> {
        let plan = self.plan(options)?;
        let text = truncate(text, plan.max_chars);

        let key = plan.options.cache_key(&text);
        if plan.cache {
            if let Some(hit) = self.cache.get(&key) {
                self.note_cache_hit();
                return Ok(hit);
            }
        }

        let context = if plan.context {
            self.context.summary()
        } else {
            None
        };

        let started = Instant::now();
        let mut result = plan.provider.analyze(&text, &plan.options).await?;
        self.stamp(&mut result, id.to_string(), started.elapsed());
        result.context = context;

        if plan.context {
            let update = self
                .context
                .record(&result.text, result.sentiment, result.timestamp_ms);
            self.listeners.emit(&EngineEvent::ContextUpdate(update));
        }
        if plan.cache {
            self.store(key, &result);
        }
        self.listeners
            .emit(&EngineEvent::AnalysisComplete(result.clone()));
        Ok(result)
    }

    /// Results come back in input order; empty entries are skipped.
    ///
    /// Cached texts never reach the provider. The misses go to the provider's
    /// native batch endpoint when it has one, otherwise they fan out through
    /// [`Self::analyze_sentiment`] with at most `batch_concurrency` in flight.
    /// The first failure fails the whole call.
    pub async fn batch_analyze_sentiment(
        &self,
        texts: &[String],
        options: &AnalysisOptions,
    ) -> Result<Vec<AnalysisResult>> {
        self.ensure_ready()?;
        let (enabled, concurrency) = {
            let s = self.settings();
            (s.batch_processing_enabled, s.effective_batch_concurrency())
        };
        if !enabled {
            return Err(EngineError::validation("batch processing is not enabled"));
        }

        let plan = match self.plan(options) {
            Ok(plan) => plan,
            Err(e) => {
                self.report_failure(&new_analysis_id(), &texts.join("\n"), &e);
                return Err(e);
            }
        };
        let valid: Vec<String> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| truncate(t, plan.max_chars))
            .collect();
        if valid.is_empty() {
            return Ok(Vec::new());
        }

        let mut slots: Vec<Option<AnalysisResult>> = vec![None; valid.len()];
        let mut misses: Vec<(usize, String)> = Vec::new();
        for (pos, text) in valid.into_iter().enumerate() {
            if plan.cache {
                if let Some(hit) = self.cache.get(&plan.options.cache_key(&text)) {
                    self.note_cache_hit();
                    slots[pos] = Some(hit);
                    continue;
                }
            }
            misses.push((pos, text));
        }
        debug!(
            total = slots.len(),
            misses = misses.len(),
            provider = %plan.options.provider,
            "batch partitioned"
        );

        if !misses.is_empty() {
            if plan.provider.supports_batch() {
                self.dispatch_native_batch(&plan, misses, &mut slots).await?;
            } else {
                let fresh: Vec<(usize, AnalysisResult)> = stream::iter(misses.into_iter().map(
                    |(pos, text)| async move {
                        self.analyze_sentiment(&text, options)
                            .await
                            .map(|r| (pos, r))
                    },
                ))
                .buffered(concurrency)
                .try_collect()
                .await?;
                for (pos, result) in fresh {
                    slots[pos] = Some(result);
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// One round-trip for all misses. Results are stamped and cached; the
    /// context and per-item completion events are left untouched.
    async fn dispatch_native_batch(
        &self,
        plan: &CallPlan,
        misses: Vec<(usize, String)>,
        slots: &mut [Option<AnalysisResult>],
    ) -> Result<()> {
        let texts: Vec<String> = misses.iter().map(|(_, t)| t.clone()).collect();
        let started = Instant::now();
        let outcome = plan
            .provider
            .batch_analyze(&texts, &plan.options)
            .await
            .and_then(|results| {
                if results.len() == texts.len() {
                    Ok(results)
                } else {
                    Err(EngineError::provider(
                        plan.options.provider,
                        format!(
                            "batch returned {} results for {} texts",
                            results.len(),
                            texts.len()
                        ),
                    ))
                }
            });
        let results = match outcome {
            Ok(r) => r,
            Err(e) => {
                self.report_failure(&new_analysis_id(), &texts.join("\n"), &e);
                return Err(e);
            }
        };

        let elapsed = started.elapsed();
        for ((pos, text), mut result) in misses.into_iter().zip(results) {
            self.stamp(&mut result, new_analysis_id(), elapsed);
            if plan.cache {
                self.store(plan.options.cache_key(&text), &result);
            }
            slots[pos] = Some(result);
        }
        Ok(())
    }

    pub async fn detect_emotions(
        &self,
        text: &str,
        options: &AnalysisOptions,
    ) -> Result<EmotionResult> {
        self.ensure_ready()?;
        let (enabled, max_chars) = {
            let s = self.settings();
            (s.enable_emotion_detection, s.max_text_length)
        };
        if !enabled {
            return Err(EngineError::validation("emotion detection is not enabled"));
        }
        if text.trim().is_empty() {
            return Err(EngineError::validation("no text provided for emotion detection"));
        }

        let text = truncate(text, max_chars);
        let opts = self.resolve(options);
        // Provider classifiers only run where the provider itself could.
        let capable = self.providers.get(&opts.provider).is_some_and(|p| {
            let d = p.descriptor();
            d.supports_language(&opts.language) && d.supports_mode(opts.mode)
        });
        let classifier: &dyn EmotionClassifier = match self.classifiers.get(&opts.provider) {
            Some(c) if capable && c.is_configured() => &**c,
            _ => &LexiconEmotionClassifier,
        };
        debug!(classifier = classifier.name(), provider = %opts.provider, "detecting emotions");

        let outcome = classifier.detect(&text, &opts).await;
        match outcome {
            Ok(result) => {
                debug!(
                    primary = ?result.primary_emotion,
                    source = %result.provider,
                    "emotions detected"
                );
                self.listeners
                    .emit(&EngineEvent::EmotionDetected(result.clone()));
                Ok(result)
            }
            Err(e) => {
                self.report_failure(&new_analysis_id(), &text, &e);
                Err(e)
            }
        }
    }

    /// Categories: the caller's, else `custom_categories`, else the built-in set.
    /// The active provider's own extraction wins when it has one.
    pub async fn analyze_aspects(
        &self,
        text: &str,
        categories: &[String],
        options: &AnalysisOptions,
    ) -> Result<AspectReport> {
        self.ensure_ready()?;
        let (enabled, max_chars, custom) = {
            let s = self.settings();
            (
                s.enable_aspect_analysis,
                s.max_text_length,
                s.custom_categories.clone(),
            )
        };
        if !enabled {
            return Err(EngineError::validation("aspect-based analysis is not enabled"));
        }
        if text.trim().is_empty() {
            return Err(EngineError::validation("no text provided for aspect analysis"));
        }

        let text = truncate(text, max_chars);
        let opts = self.resolve(options);

        if let Some(provider) = self.providers.get(&opts.provider) {
            match provider.extract_aspects(&text, categories, &opts).await {
                Ok(Some(report)) => return Ok(report),
                Ok(None) => {}
                Err(e) => {
                    self.report_failure(&new_analysis_id(), &text, &e);
                    return Err(e);
                }
            }
        }

        let effective: Vec<String> = if !categories.is_empty() {
            categories.to_vec()
        } else if !custom.is_empty() {
            custom
        } else {
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        };
        Ok(aspects::extract_rule_based(&text, &effective, &opts))
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub fn on(&self, kind: EventKind, callback: Listener) -> String {
        self.listeners.on(kind, callback)
    }

    pub fn off<'a>(&self, kind: EventKind, which: impl Into<ListenerRef<'a>>) -> bool {
        self.listeners.off(kind, which)
    }

    // ---------------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------------

    /// Current settings with credentials redacted.
    pub fn configuration(&self) -> EngineConfig {
        let mut cfg = self.settings().clone();
        for v in cfg.api_keys.values_mut() {
            *v = REDACTED.to_string();
        }
        cfg
    }

    pub fn available_providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .values()
            .map(|p| ProviderInfo {
                descriptor: p.descriptor().clone(),
                supports_batch: p.supports_batch(),
                configured: p.is_configured(),
            })
            .collect()
    }

    pub fn statistics(&self) -> EngineStats {
        let s = self.settings();
        EngineStats {
            initialized: self.is_initialized(),
            provider: s.analysis_provider,
            mode: s.analysis_mode,
            language: s.language.clone(),
            registered_providers: self.providers.keys().copied().collect(),
            cache_size: self.cache.len(),
            max_cache_size: self.cache.max_size(),
            context_size: self.context.len(),
            context_window_size: self.context.window_size(),
            domain_vocabularies: self.domains_read().len(),
            listeners: self.listeners.len(),
            total_analyses: self.counters.analyses.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    pub fn context_history(&self, limit: usize) -> Vec<ContextEntry> {
        self.context.history(limit)
    }

    // ---------------------------------------------------------------------
    // Runtime settings
    // ---------------------------------------------------------------------

    pub fn set_analysis_provider(&self, kind: ProviderKind) -> bool {
        if !self.providers.contains_key(&kind) {
            warn!(provider = %kind, "cannot switch to unregistered provider");
            return false;
        }
        self.settings_mut().analysis_provider = kind;
        info!(provider = %kind, "default provider changed");
        true
    }

    /// Accepted only if the default provider supports `mode`.
    pub fn set_analysis_mode(&self, mode: AnalysisMode) -> bool {
        let mut s = self.settings_mut();
        let supported = self
            .providers
            .get(&s.analysis_provider)
            .is_some_and(|p| p.descriptor().supports_mode(mode));
        if supported {
            s.analysis_mode = mode;
        } else {
            warn!(%mode, provider = %s.analysis_provider, "mode not supported by provider");
        }
        supported
    }

    /// Accepted only if the default provider supports `language`.
    pub fn set_language(&self, language: &str) -> bool {
        let language = language.trim().to_ascii_lowercase();
        let mut s = self.settings_mut();
        let supported = self
            .providers
            .get(&s.analysis_provider)
            .is_some_and(|p| p.descriptor().supports_language(&language));
        if supported {
            s.language = language;
        } else {
            warn!(%language, provider = %s.analysis_provider, "language not supported by provider");
        }
        supported
    }

    /// Takes effect for registered adapters immediately; an empty key clears it.
    pub fn set_api_key(&self, kind: ProviderKind, key: &str) -> bool {
        if kind.key_env_var().is_none() {
            return false;
        }
        self.credentials.set(kind, key);
        let mut s = self.settings_mut();
        if key.trim().is_empty() {
            s.api_keys.remove(kind.as_str());
        } else {
            s.api_keys
                .insert(kind.as_str().to_string(), key.trim().to_string());
        }
        info!(provider = %kind, "API key updated");
        true
    }

    /// Merges `vocabulary` into the overlay for `domain` (new words win).
    /// Cached results are dropped since they may have been scored with the old overlay.
    pub fn add_domain_vocabulary(&self, domain: &str, vocabulary: Lexicon) -> bool {
        let domain = domain.trim();
        if domain.is_empty() || vocabulary.is_empty() {
            return false;
        }
        let vocabulary: Lexicon = vocabulary
            .into_iter()
            .filter(|(_, w)| w.is_finite())
            .map(|(k, w)| (k.to_lowercase(), w.clamp(-1.0, 1.0)))
            .collect();

        let terms = {
            let mut domains = self.domains.write().unwrap_or_else(|p| p.into_inner());
            let entry = domains.entry(domain.to_string()).or_default();
            let mut merged = (**entry).clone();
            merged.extend(vocabulary.clone());
            let n = merged.len();
            *entry = Arc::new(merged);
            n
        };
        self.settings_mut()
            .domain_specific_vocabulary
            .entry(domain.to_string())
            .or_default()
            .extend(vocabulary);
        self.cache.clear();
        info!(domain = %domain, terms, "domain vocabulary updated");
        true
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    pub fn clear_cache(&self) {
        self.cache.clear();
        gauge!("sentiment_cache_entries").set(0.0);
    }

    pub fn clear_context(&self) {
        self.context.clear();
    }

    /// Drops cached results and context history; listeners stay.
    pub fn reset(&self) {
        self.clear_cache();
        self.clear_context();
        info!("sentiment engine reset");
    }

    /// Releases all state. Every later analysis call fails with a validation error.
    pub fn close(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.reset();
        self.listeners.clear();
        info!("sentiment engine closed");
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn ensure_ready(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(EngineError::validation("sentiment engine is not initialized"))
        }
    }

    fn settings(&self) -> RwLockReadGuard<'_, EngineConfig> {
        self.settings.read().unwrap_or_else(|p| p.into_inner())
    }

    fn settings_mut(&self) -> RwLockWriteGuard<'_, EngineConfig> {
        self.settings.write().unwrap_or_else(|p| p.into_inner())
    }

    fn domains_read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Lexicon>>> {
        self.domains.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Per-call options merged with the engine defaults. No capability checks.
    fn resolve(&self, options: &AnalysisOptions) -> ResolvedOptions {
        let s = self.settings();
        let language = options
            .language
            .as_deref()
            .map(|l| l.trim().to_ascii_lowercase())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| s.language.clone());
        let domain = options
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let domain_lexicon = domain
            .as_ref()
            .and_then(|d| self.domains_read().get(d).cloned());
        if domain.is_some() && domain_lexicon.is_none() {
            debug!(domain = ?domain, "no vocabulary registered for domain");
        }
        ResolvedOptions {
            provider: options.provider.unwrap_or(s.analysis_provider),
            mode: options.mode.unwrap_or(s.analysis_mode),
            language,
            domain,
            sensitivity: s.sensitivity_level,
            domain_lexicon,
        }
    }

    /// Resolve options and select exactly one provider. No fallback.
    fn plan(&self, options: &AnalysisOptions) -> Result<CallPlan> {
        let options = self.resolve(options);
        let provider = self.providers.get(&options.provider).cloned().ok_or_else(|| {
            EngineError::unavailable(format!("provider '{}' is not registered", options.provider))
        })?;
        let d = provider.descriptor();
        if !d.supports_language(&options.language) {
            return Err(EngineError::unavailable(format!(
                "provider '{}' does not support language '{}'",
                d.id, options.language
            )));
        }
        if !d.supports_mode(options.mode) {
            return Err(EngineError::unavailable(format!(
                "provider '{}' does not support mode '{}'",
                d.id, options.mode
            )));
        }

        let s = self.settings();
        Ok(CallPlan {
            max_chars: s.max_text_length.min(d.max_text_length),
            cache: s.cache_sentiment_results,
            context: s.enable_context_awareness,
            provider,
            options,
        })
    }

    fn stamp(&self, result: &mut AnalysisResult, id: String, elapsed: Duration) {
        result.id = id;
        result.timestamp_ms = now_ms();
        result.processing_time_ms = elapsed.as_millis() as u64;
        result.from_cache = false;

        self.counters.analyses.fetch_add(1, Ordering::Relaxed);
        counter!("sentiment_analyses_total", "provider" => result.provider.as_str()).increment(1);
        histogram!("sentiment_processing_ms").record(elapsed.as_secs_f64() * 1000.0);
    }

    fn store(&self, key: crate::cache::CacheKey, result: &AnalysisResult) {
        self.cache.insert(key, result.clone());
        gauge!("sentiment_cache_entries").set(self.cache.len() as f64);
    }

    fn note_cache_hit(&self) {
        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("sentiment_cache_hits_total").increment(1);
    }

    fn report_failure(&self, id: &str, text: &str, error: &EngineError) {
        self.counters.errors.fetch_add(1, Ordering::Relaxed);
        counter!("sentiment_errors_total", "kind" => error.kind()).increment(1);
        warn!(id, error = %error, "analysis failed");
        self.listeners.emit(&EngineEvent::Error(AnalysisFailure {
            id: id.to_string(),
            text: text.to_string(),
            error_message: error.to_string(),
            timestamp_ms: now_ms(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::MockProvider;
    use crate::result::SentimentLabel;
    use std::sync::atomic::AtomicUsize;

    fn local_only() -> EngineConfig {
        EngineConfig {
            enabled_providers: vec![ProviderKind::Local],
            ..EngineConfig::default()
        }
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn default_provider_must_be_registered() {
        let cfg = EngineConfig {
            analysis_provider: ProviderKind::Azure,
            ..local_only()
        };
        assert!(matches!(
            SentimentEngine::new(cfg),
            Err(EngineError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn empty_text_is_a_validation_error_without_on_error() {
        let engine = SentimentEngine::new(local_only()).unwrap();
        let errors = Arc::new(AtomicUsize::new(0));
        let e = errors.clone();
        engine.on(
            EventKind::Error,
            Arc::new(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let err = engine
            .analyze_sentiment("   ", &AnalysisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsupported_language_has_no_fallback() {
        let engine = SentimentEngine::new(local_only()).unwrap();
        let err = engine
            .analyze_sentiment("hola", &AnalysisOptions::default().with_language("ja"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ProviderUnavailable(_)));

        let err = engine
            .analyze_sentiment(
                "hello",
                &AnalysisOptions::default().with_mode(AnalysisMode::Academic),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ProviderUnavailable(_)));
        assert_eq!(engine.statistics().errors, 2);
    }

    #[tokio::test]
    async fn truncates_to_the_smaller_limit() {
        let mock = Arc::new(MockProvider::new(ProviderKind::Local).with_max_text_length(5));
        let engine = SentimentEngine::builder(local_only())
            .provider(mock.clone())
            .build()
            .unwrap();
        let r = engine
            .analyze_sentiment("abcdefghij", &AnalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(r.text, "abcde");
        assert_eq!(mock.seen_texts(), vec!["abcde"]);
    }

    #[tokio::test]
    async fn setters_validate_against_default_provider() {
        let engine = SentimentEngine::new(local_only()).unwrap();
        assert!(!engine.set_analysis_provider(ProviderKind::OpenAi));
        assert!(engine.set_analysis_mode(AnalysisMode::Detailed));
        assert!(!engine.set_analysis_mode(AnalysisMode::Social));
        assert!(engine.set_language("DE"));
        assert!(!engine.set_language("ko"));
        assert!(!engine.set_api_key(ProviderKind::Local, "x"));
        let stats = engine.statistics();
        assert_eq!(stats.mode, AnalysisMode::Detailed);
        assert_eq!(stats.language, "de");
    }

    #[tokio::test]
    async fn domain_vocabulary_changes_results_and_clears_cache() {
        let engine = SentimentEngine::new(local_only()).unwrap();
        let opts = AnalysisOptions::default().with_domain("gaming");
        let r = engine.analyze_sentiment("that combo was sick", &opts).await.unwrap();
        assert_eq!(r.sentiment, SentimentLabel::Neutral);

        let vocab: Lexicon = [("Sick".to_string(), 0.8)].into_iter().collect();
        assert!(engine.add_domain_vocabulary("gaming", vocab));
        assert_eq!(engine.statistics().cache_size, 0);
        let r = engine.analyze_sentiment("that combo was sick", &opts).await.unwrap();
        assert_eq!(r.sentiment, SentimentLabel::Positive);
        assert!(!r.from_cache);
        assert!(!engine.add_domain_vocabulary(" ", Lexicon::new()));
    }

    #[tokio::test]
    async fn unconfigured_provider_is_reported_and_rejected() {
        let mock = Arc::new(MockProvider::new(ProviderKind::Local).unconfigured());
        let engine = SentimentEngine::builder(local_only())
            .provider(mock)
            .build()
            .unwrap();
        let info = engine.available_providers();
        assert_eq!(info.len(), 1);
        assert!(!info[0].configured);

        let err = engine
            .analyze_sentiment("hello", &AnalysisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert_eq!(engine.statistics().errors, 1);
    }

    #[tokio::test]
    async fn configuration_redacts_keys() {
        let mut cfg = local_only();
        cfg.api_keys.insert("openai".into(), "sk-secret".into());
        let engine = SentimentEngine::new(cfg).unwrap();
        let shown = engine.configuration();
        assert_eq!(shown.api_keys["openai"], REDACTED);
    }

    #[tokio::test]
    async fn close_rejects_later_calls() {
        let engine = SentimentEngine::new(local_only()).unwrap();
        engine
            .analyze_sentiment("good", &AnalysisOptions::default())
            .await
            .unwrap();
        engine.on(EventKind::Error, Arc::new(|_| {}));
        engine.close();
        let stats = engine.statistics();
        assert!(!stats.initialized);
        assert_eq!(stats.cache_size, 0);
        assert_eq!(stats.context_size, 0);
        assert_eq!(stats.listeners, 0);
        let err = engine
            .analyze_sentiment("good", &AnalysisOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
