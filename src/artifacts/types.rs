//! Artifact lifecycle types

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::LifecycleConfig;
use crate::split::PageRange;

// ============================================================================
// Record
// ============================================================================

/// One accepted submission: the uploaded original plus the derived PDF.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    /// Unique artifact ID
    pub id: Uuid,

    /// Uploaded original
    pub source_path: PathBuf,

    /// Derived PDF served to the downloader
    pub result_path: PathBuf,

    /// Registration time
    pub created_at: DateTime<Utc>,

    /// Whether the result has been downloaded at least once
    pub downloaded: bool,

    /// Time of the first download
    pub downloaded_at: Option<DateTime<Utc>>,

    /// Filename offered in Content-Disposition
    pub display_name: String,

    /// Page range that was extracted
    pub range: PageRange,

    /// Page count of the derived PDF
    pub page_count: u32,
}

impl ArtifactRecord {
    pub fn new(
        id: Uuid,
        source_path: PathBuf,
        result_path: PathBuf,
        display_name: String,
        range: PageRange,
        page_count: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source_path,
            result_path,
            created_at,
            downloaded: false,
            downloaded_at: None,
            display_name,
            range,
            page_count,
        }
    }

    pub fn status(&self) -> ArtifactStatus {
        if self.downloaded {
            ArtifactStatus::Downloaded
        } else {
            ArtifactStatus::Created
        }
    }

    /// Record the first download. Later calls change nothing and return false.
    pub(crate) fn mark_downloaded(&mut self, now: DateTime<Utc>) -> bool {
        if self.downloaded {
            return false;
        }
        self.downloaded = true;
        self.downloaded_at = Some(now);
        true
    }
}

/// Live states of an artifact. Evicted artifacts have no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    Created,
    Downloaded,
}

// ============================================================================
// Expiry
// ============================================================================

/// When an artifact stops being served.
///
/// Undownloaded artifacts live `creation_ttl` from registration. The first
/// download restarts the clock: from then on the artifact lives
/// `download_ttl` from the download time, regardless of the original
/// deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    creation_ttl: chrono::Duration,
    download_ttl: chrono::Duration,
}

impl ExpiryPolicy {
    pub fn new(creation_ttl: Duration, download_ttl: Duration) -> Self {
        Self {
            creation_ttl: to_chrono(creation_ttl),
            download_ttl: to_chrono(download_ttl),
        }
    }

    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(config.creation_ttl, config.download_ttl)
    }

    pub fn expires_at(&self, record: &ArtifactRecord) -> DateTime<Utc> {
        let (anchor, ttl) = match record.downloaded_at {
            Some(downloaded_at) => (downloaded_at, self.download_ttl),
            None => (record.created_at, self.creation_ttl),
        };
        anchor
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Expired strictly after the deadline; the deadline instant itself is
    /// still live.
    pub fn is_expired(&self, record: &ArtifactRecord, now: DateTime<Utc>) -> bool {
        now > self.expires_at(record)
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365 * 100))
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Unknown, malformed, expired and evicted ids are indistinguishable.
    #[error("File not found or expired")]
    NotFound,

    #[error("Artifact already registered: {0}")]
    Duplicate(Uuid),
}
