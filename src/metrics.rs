use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

// The recorder is process-global; every app built in this process shares it.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder on first call; later calls reuse it.
pub fn install() -> anyhow::Result<PrometheusHandle> {
    HANDLE
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("prometheus: install recorder")?;
            describe();
            Ok(handle)
        })
        .cloned()
}

fn describe() {
    describe_counter!(
        "sentiment_analyses_total",
        "Fresh provider analyses, labelled by provider."
    );
    describe_counter!("sentiment_cache_hits_total", "Results served from the cache.");
    describe_counter!(
        "sentiment_errors_total",
        "Failed operations, labelled by error kind."
    );
    describe_histogram!(
        "sentiment_processing_ms",
        "Provider processing time in milliseconds."
    );
    describe_gauge!("sentiment_cache_entries", "Current result cache size.");
}

/// Router exposing `/metrics` in the Prometheus exposition format.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}
