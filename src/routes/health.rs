//! Health check and service index

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::split::RangePolicy;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
    pub rate_limit_seconds: u64,
    pub file_ttl_minutes: u64,
    pub download_ttl_minutes: u64,
    pub range_policy: RangePolicy,
}

/// GET /
async fn index(State(state): State<AppState>) -> Json<IndexResponse> {
    let lifecycle = &state.config().lifecycle;

    Json(IndexResponse {
        service: "pdf-splitter",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "POST /split",
            "GET /download/{file_id}",
            "GET /status/{file_id}",
            "GET /health",
        ],
        rate_limit_seconds: lifecycle.rate_limit_window.as_secs(),
        file_ttl_minutes: lifecycle.creation_ttl.as_secs().div_ceil(60),
        download_ttl_minutes: lifecycle.download_ttl.as_secs().div_ceil(60),
        range_policy: state.config().split.range_policy,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}
