//! Split Routes
//!
//! Endpoints:
//! - POST /split      - Upload a PDF and extract a page range
//! - POST /split-pdf  - Same, under the original path
//!
//! The multipart body carries the PDF in a `file` (or `pdf`) part and the
//! range in `start`/`end` (or `start_page`/`end_page`) text parts. The same
//! names are accepted as query parameters; multipart values win.

use std::net::SocketAddr;
use std::path::Path;

use axum::{
    extract::{
        multipart::{Field, MultipartError},
        ConnectInfo, DefaultBodyLimit, Multipart, Query, State,
    },
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::artifacts::ArtifactRecord;
use crate::error::{AppError, Result};
use crate::rate_limit::client_key;
use crate::split::Extraction;
use crate::state::AppState;
use crate::storage::{PendingArtifact, ScratchStorage};

// ============================================================================
// Request / Response
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SplitQuery {
    #[serde(alias = "start_page")]
    pub start: Option<i64>,
    #[serde(alias = "end_page")]
    pub end: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SplitResponse {
    pub file_id: String,
    pub message: String,
    pub download_url: String,
    pub expires_in_minutes: u64,
    pub expires_in_seconds: u64,
    pub page_count: u32,
    pub start_page: u32,
    pub end_page: u32,
}

/// Parsed multipart form. The upload itself is already on disk.
struct SplitForm {
    file_name: String,
    size: u64,
    start: i64,
    end: Option<i64>,
}

// ============================================================================
// Router
// ============================================================================

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/split", post(split_pdf))
        .route("/split-pdf", post(split_pdf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /split
async fn split_pdf(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<SplitQuery>,
    multipart: Multipart,
) -> Result<Json<SplitResponse>> {
    let client = client_key(&headers, peer);
    if !state.rate_limiter().admit(&client, Utc::now()) {
        tracing::warn!(client = %client, "Rate limit exceeded");
        return Err(AppError::RateLimited {
            retry_after: state.rate_limiter().window(),
        });
    }

    let id = Uuid::new_v4();
    // Deletes both files on any early return, including a dropped request.
    let pending = state.storage().pending(id);

    let (form, extraction) = upload_and_extract(&state, &pending, query, multipart).await?;

    let record = ArtifactRecord::new(
        id,
        pending.input().to_path_buf(),
        pending.output().to_path_buf(),
        ScratchStorage::display_name(id),
        extraction.range,
        extraction.page_count,
        Utc::now(),
    );
    let registered = state.registry().register(record).await;
    // A duplicate id shares its paths with the live record, which owns the
    // files either way.
    pending.keep();
    registered?;

    tracing::info!(
        artifact_id = %id,
        client = %client,
        file_name = %form.file_name,
        size = form.size,
        range = %extraction.range,
        page_count = extraction.page_count,
        "PDF split successfully"
    );

    let ttl = state.config().lifecycle.creation_ttl.as_secs();
    Ok(Json(SplitResponse {
        file_id: id.to_string(),
        message: "PDF split successfully".to_string(),
        download_url: format!("/download/{id}"),
        expires_in_minutes: ttl.div_ceil(60),
        expires_in_seconds: ttl,
        page_count: extraction.page_count,
        start_page: extraction.range.start(),
        end_page: extraction.range.end(),
    }))
}

/// Everything that writes files.
async fn upload_and_extract(
    state: &AppState,
    pending: &PendingArtifact,
    query: SplitQuery,
    multipart: Multipart,
) -> Result<(SplitForm, Extraction)> {
    let form = read_form(multipart, pending.input(), query).await?;

    let extraction = state
        .extractor()
        .extract_file_blocking(
            pending.input().to_path_buf(),
            pending.output().to_path_buf(),
            form.start,
            form.end,
        )
        .await?;

    Ok((form, extraction))
}

async fn read_form(mut multipart: Multipart, input_path: &Path, query: SplitQuery) -> Result<SplitForm> {
    let mut start = query.start;
    let mut end = query.end;
    let mut upload: Option<(String, u64)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("Failed to read upload", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" | "pdf" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                if !is_pdf_name(&file_name) {
                    return Err(AppError::InvalidFileType(file_name));
                }
                let size = write_field(&mut field, input_path).await?;
                upload = Some((file_name, size));
            }
            "start" | "start_page" => {
                start = parse_page(&name, &field_text(field).await?)?;
            }
            "end" | "end_page" => {
                end = parse_page(&name, &field_text(field).await?)?;
            }
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    let (file_name, size) = upload.ok_or_else(|| {
        AppError::BadRequest("No file provided. Use field name 'file' or 'pdf'".to_string())
    })?;
    if size == 0 {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    Ok(SplitForm {
        file_name,
        size,
        start: start.unwrap_or(1),
        end,
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Stream a file part to disk. Returns the number of bytes written.
async fn write_field(field: &mut Field<'_>, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| upload_error("Failed to read file data", e))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}

async fn field_text(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| upload_error("Failed to read form field", e))
}

/// Keeps the status multer chose, e.g. 413 when the body limit is hit.
fn upload_error(context: &str, err: MultipartError) -> AppError {
    AppError::Upload {
        status: err.status(),
        message: format!("{context}: {}", err.body_text()),
    }
}

/// Blank means "not given".
fn parse_page(name: &str, raw: &str) -> Result<Option<i64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("{name} must be an integer, got {trimmed:?}")))
}

fn is_pdf_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".pdf")
}
