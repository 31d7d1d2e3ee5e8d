//! Page range extraction
//!
//! Copies a contiguous page range of a PDF into a new document using lopdf.
//! Pages outside the range are removed from the page tree and any objects
//! only they referenced are pruned before saving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lopdf::Document;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::range::{PageRange, RangeError, RangePolicy};
use crate::storage::remove_file_quietly;

/// Default upper bound for one extraction
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Failed to write PDF: {0}")]
    Save(String),

    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Outcome of a successful extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction {
    pub range: PageRange,
    /// Page count of the source document
    pub source_pages: u32,
    /// Page count of the written document
    pub page_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RangeExtractor {
    policy: RangePolicy,
    /// Bound for [`extract_file_blocking`](Self::extract_file_blocking).
    /// Pathological PDFs can make lopdf spin for a long time.
    timeout: Duration,
}

impl Default for RangeExtractor {
    fn default() -> Self {
        Self::new(RangePolicy::default())
    }
}

impl RangeExtractor {
    pub fn new(policy: RangePolicy) -> Self {
        Self {
            policy,
            timeout: DEFAULT_EXTRACT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reduce `doc` in place to the requested pages.
    pub fn extract(
        &self,
        doc: &mut Document,
        start: i64,
        end: Option<i64>,
    ) -> Result<Extraction, SplitError> {
        let pages = doc.get_pages();
        let source_pages = u32::try_from(pages.len())
            .map_err(|_| SplitError::Load("too many pages".to_string()))?;
        let range = PageRange::resolve(start, end, source_pages, self.policy)?;

        let dropped: Vec<u32> = pages
            .keys()
            .copied()
            .filter(|page| !range.contains(*page))
            .collect();

        if !dropped.is_empty() {
            doc.delete_pages(&dropped);
            doc.prune_objects();
        }

        let page_count = doc.get_pages().len() as u32;
        if page_count != range.page_count() {
            tracing::warn!(
                range = %range,
                page_count,
                "Page tree did not match the requested range"
            );
        }
        tracing::debug!(
            range = %range,
            source_pages,
            page_count,
            "Extracted page range"
        );

        Ok(Extraction {
            range,
            source_pages,
            page_count,
        })
    }

    /// Extract from an in-memory PDF and return the serialized result.
    pub fn extract_bytes(
        &self,
        data: &[u8],
        start: i64,
        end: Option<i64>,
    ) -> Result<(Extraction, Vec<u8>), SplitError> {
        let mut doc = Document::load_mem(data).map_err(|e| SplitError::Load(e.to_string()))?;
        let extraction = self.extract(&mut doc, start, end)?;

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| SplitError::Save(e.to_string()))?;
        Ok((extraction, out))
    }

    /// Read `source`, extract the range and write it to `dest`.
    pub fn extract_file(
        &self,
        source: &Path,
        dest: &Path,
        start: i64,
        end: Option<i64>,
    ) -> Result<Extraction, SplitError> {
        let mut doc = Document::load(source).map_err(|e| SplitError::Load(e.to_string()))?;
        let extraction = self.extract(&mut doc, start, end)?;
        doc.save(dest).map_err(|e| SplitError::Save(e.to_string()))?;
        Ok(extraction)
    }

    /// [`extract_file`](Self::extract_file) on the blocking pool, bounded by
    /// the configured timeout.
    ///
    /// The blocking thread cannot be interrupted. If this future times out or
    /// is dropped, `dest` is deleted once the thread has finished, so a late
    /// write never outlives the request.
    pub async fn extract_file_blocking(
        &self,
        source: PathBuf,
        dest: PathBuf,
        start: i64,
        end: Option<i64>,
    ) -> Result<Extraction, SplitError> {
        let extractor = *self;
        let out = dest.clone();
        let mut task = InFlight::new(
            tokio::task::spawn_blocking(move || extractor.extract_file(&source, &out, start, end)),
            dest,
        );

        match timeout(self.timeout, task.join()).await {
            Ok(Some(joined)) => joined.map_err(|e| SplitError::Task(e.to_string()))?,
            Ok(None) => Err(SplitError::Task("extraction already joined".to_string())),
            Err(_) => Err(SplitError::Timeout(self.timeout.as_secs())),
        }
    }
}

// ============================================================================
// In-flight extraction
// ============================================================================

/// A blocking extraction whose output belongs to nobody until it is joined.
struct InFlight<T: Send + 'static> {
    handle: Option<JoinHandle<T>>,
    dest: PathBuf,
}

impl<T: Send + 'static> InFlight<T> {
    fn new(handle: JoinHandle<T>, dest: PathBuf) -> Self {
        Self {
            handle: Some(handle),
            dest,
        }
    }

    /// Wait for the thread; `None` if it was already joined. Once this
    /// returns, dropping `self` is a no-op.
    async fn join(&mut self) -> Option<Result<T, tokio::task::JoinError>> {
        let joined = self.handle.as_mut()?.await;
        self.handle = None;
        Some(joined)
    }
}

impl<T: Send + 'static> Drop for InFlight<T> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let dest = std::mem::take(&mut self.dest);
        tracing::warn!(
            path = %dest.display(),
            "Extraction abandoned, output will be removed when it finishes"
        );

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = handle.await;
                    remove_file_quietly(&dest).await;
                });
            }
            Err(_) => {
                let _ = std::fs::remove_file(&dest);
            }
        }
    }
}
