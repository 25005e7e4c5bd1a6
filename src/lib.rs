// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod lexicon;
pub mod metrics;
pub mod result;
pub mod sentiment;

// Providers, emotion classifiers, aspect extraction
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{AnalysisOptions, Provider, ProviderDescriptor, ProviderInfo};
pub use crate::api::router;
pub use crate::config::{AnalysisMode, EngineConfig, ProviderKind, Sensitivity};
pub use crate::engine::{EngineStats, SentimentEngine};
pub use crate::error::{EngineError, Result};
pub use crate::events::{EngineEvent, EventKind, Listener};
pub use crate::result::{AnalysisResult, AspectReport, Emotion, EmotionResult, SentimentLabel};

use axum::Router;
use std::sync::Arc;
use tracing::info;

/// Full HTTP app: engine from the default config locations, API routes and `/metrics`.
pub async fn app() -> anyhow::Result<Router> {
    let config = EngineConfig::load_default()?;
    let engine = Arc::new(SentimentEngine::new(config)?);
    app_with_engine(engine)
}

/// Same as [`app`] around an engine the caller already built.
pub fn app_with_engine(engine: Arc<SentimentEngine>) -> anyhow::Result<Router> {
    let handle = metrics::install()?;
    info!(
        providers = engine.available_providers().len(),
        "HTTP app assembled"
    );
    Ok(api::router(engine).merge(metrics::router(handle)))
}
