//! Artifact routes
//!
//! Endpoints:
//! - GET /download/:id - Fetch the split PDF as an attachment
//! - GET /status/:id   - Inspect an artifact without downloading it

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::artifacts::ArtifactStatus;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the artifacts router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/download/:id", get(download))
        .route("/status/:id", get(status))
}

// ============================================================================
// Download
// ============================================================================

/// GET /download/:id
///
/// Every successful call serves the file. The first one also shortens the
/// artifact's remaining lifetime to the download TTL.
async fn download(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let now = Utc::now();
    let record = state.registry().get_by_str(&id, now).await?;

    // The sweeper may have deleted the file between lookup and read.
    let bytes = match tokio::fs::read(&record.result_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let record = state.registry().mark_downloaded(record.id, now).await?;

    tracing::debug!(
        artifact_id = %record.id,
        size = bytes.len(),
        "Serving split PDF"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.display_name),
        )
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub file_id: String,
    pub state: ArtifactStatus,
    pub created_at: DateTime<Utc>,
    pub downloaded: bool,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub download_url: String,
    pub page_count: u32,
}

#[derive(Debug, Serialize)]
pub struct StatusNotFound {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /status/:id
async fn status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.registry().get_by_str(&id, Utc::now()).await {
        Ok(record) => Json(StatusResponse {
            status: "ready",
            file_id: record.id.to_string(),
            state: record.status(),
            created_at: record.created_at,
            downloaded: record.downloaded,
            downloaded_at: record.downloaded_at,
            expires_at: state.registry().expires_at(&record),
            download_url: format!("/download/{}", record.id),
            page_count: record.page_count,
        })
        .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(StatusNotFound {
                status: "not_found",
                message: "File not found or expired",
            }),
        )
            .into_response(),
    }
}
