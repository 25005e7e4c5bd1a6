// tests/metrics.rs
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::Request;
use axum::Router;
use http::StatusCode;
use tower::ServiceExt;

use chat_sentiment_engine::{app_with_engine, EngineConfig, ProviderKind, SentimentEngine};

fn build_app() -> Router {
    let cfg = EngineConfig {
        enabled_providers: vec![ProviderKind::Local],
        ..EngineConfig::default()
    };
    let engine = Arc::new(SentimentEngine::new(cfg).expect("engine"));
    app_with_engine(engine).expect("app_with_engine should build Router in tests")
}

async fn body_string(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

#[tokio::test]
async fn metrics_expose_analysis_counters() {
    let app = build_app();

    for text in ["great launch", "great launch", "terrible lag"] {
        let req = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"text":"{text}"}}"#)))
            .unwrap();
        let (status, _) = body_string(&app, req).await;
        assert_eq!(status, StatusCode::OK);
    }

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, text) = body_string(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("sentiment_analyses_total"), "metrics body:\n{text}");
    assert!(text.contains("sentiment_cache_hits_total"), "metrics body:\n{text}");
}

#[tokio::test]
async fn second_app_in_same_process_reuses_recorder() {
    let _first = build_app();
    let _second = build_app();
}
