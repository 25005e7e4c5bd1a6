//! Sentiment Engine Service: Binary Entrypoint
//! Boots the Axum HTTP server around a `SentimentEngine`.
//!
//! See `README.md` for configuration and routes.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `SENTIMENT_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chat_sentiment_engine=info,warn"));

    let json = std::env::var("SENTIMENT_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    // The platform may already have installed a subscriber.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        let _ = registry.with(fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(fmt::layer().compact()).try_init();
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = chat_sentiment_engine::app().await?;
    Ok(router.into())
}
