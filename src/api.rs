use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::analyze::{AnalysisOptions, ProviderInfo};
use crate::config::EngineConfig;
use crate::context::ContextEntry;
use crate::engine::{EngineStats, SentimentEngine};
use crate::error::EngineError;
use crate::result::{AnalysisResult, AspectReport, EmotionResult};

pub type AppState = Arc<SentimentEngine>;

pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/batch", post(analyze_batch))
        .route("/emotions", post(emotions))
        .route("/aspects", post(aspects))
        .route("/providers", get(providers))
        .route("/stats", get(stats))
        .route("/config", get(config))
        .route("/context", get(context))
        .route("/admin/clear-cache", post(admin_clear_cache))
        .route("/admin/clear-context", post(admin_clear_context))
        .layer(CorsLayer::very_permissive())
        .with_state(engine)
}

/// Engine error as an HTTP response: `{ "error": ..., "kind": ... }`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::ProviderUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Provider { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = json!({ "error": self.0.to_string(), "kind": self.0.kind() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
struct TextReq {
    text: String,
    #[serde(default)]
    options: AnalysisOptions,
}

#[derive(Deserialize)]
struct BatchReq {
    texts: Vec<String>,
    #[serde(default)]
    options: AnalysisOptions,
}

#[derive(Deserialize)]
struct AspectsReq {
    text: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    options: AnalysisOptions,
}

async fn analyze(
    State(engine): State<AppState>,
    Json(body): Json<TextReq>,
) -> ApiResult<AnalysisResult> {
    let result = engine.analyze_sentiment(&body.text, &body.options).await?;
    Ok(Json(result))
}

async fn analyze_batch(
    State(engine): State<AppState>,
    Json(body): Json<BatchReq>,
) -> ApiResult<Vec<AnalysisResult>> {
    let results = engine
        .batch_analyze_sentiment(&body.texts, &body.options)
        .await?;
    Ok(Json(results))
}

async fn emotions(
    State(engine): State<AppState>,
    Json(body): Json<TextReq>,
) -> ApiResult<EmotionResult> {
    let result = engine.detect_emotions(&body.text, &body.options).await?;
    Ok(Json(result))
}

async fn aspects(
    State(engine): State<AppState>,
    Json(body): Json<AspectsReq>,
) -> ApiResult<AspectReport> {
    let report = engine
        .analyze_aspects(&body.text, &body.categories, &body.options)
        .await?;
    Ok(Json(report))
}

async fn providers(State(engine): State<AppState>) -> Json<Vec<ProviderInfo>> {
    Json(engine.available_providers())
}

async fn stats(State(engine): State<AppState>) -> Json<EngineStats> {
    Json(engine.statistics())
}

async fn config(State(engine): State<AppState>) -> Json<EngineConfig> {
    Json(engine.configuration())
}

#[derive(Deserialize)]
struct ContextQuery {
    #[serde(default)]
    limit: usize,
}

async fn context(
    State(engine): State<AppState>,
    Query(q): Query<ContextQuery>,
) -> Json<Vec<ContextEntry>> {
    Json(engine.context_history(q.limit))
}

async fn admin_clear_cache(State(engine): State<AppState>) -> StatusCode {
    engine.clear_cache();
    StatusCode::NO_CONTENT
}

async fn admin_clear_context(State(engine): State<AppState>) -> StatusCode {
    engine.clear_context();
    StatusCode::NO_CONTENT
}
