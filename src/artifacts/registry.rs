//! Artifact Registry
//!
//! Tracks every live artifact from registration until eviction:
//! - In-memory record storage behind one `RwLock`
//! - Idempotent download marking
//! - Eviction that removes the record before touching the disk, so readers
//!   never see a record whose files are already gone

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{ArtifactError, ArtifactRecord, ExpiryPolicy};
use crate::storage::remove_file_quietly;

// ============================================================================
// Registry
// ============================================================================

#[derive(Clone)]
pub struct ArtifactRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Live records indexed by ID
    records: RwLock<HashMap<Uuid, ArtifactRecord>>,

    expiry: ExpiryPolicy,
}

impl ArtifactRegistry {
    pub fn new(expiry: ExpiryPolicy) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                records: RwLock::new(HashMap::new()),
                expiry,
            }),
        }
    }

    pub fn expires_at(&self, record: &ArtifactRecord) -> DateTime<Utc> {
        self.inner.expiry.expires_at(record)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Insert a freshly extracted artifact.
    pub async fn register(&self, record: ArtifactRecord) -> Result<Uuid, ArtifactError> {
        let id = record.id;
        {
            let mut records = self.inner.records.write().await;
            if records.contains_key(&id) {
                return Err(ArtifactError::Duplicate(id));
            }
            records.insert(id, record);
        }

        tracing::info!(artifact_id = %id, "Registered artifact");
        Ok(id)
    }

    /// Look up a live artifact.
    ///
    /// A record past its deadline is reported as missing even if the sweeper
    /// has not reached it yet.
    pub async fn get(&self, id: Uuid, now: DateTime<Utc>) -> Result<ArtifactRecord, ArtifactError> {
        let records = self.inner.records.read().await;
        records
            .get(&id)
            .filter(|record| !self.inner.expiry.is_expired(record, now))
            .cloned()
            .ok_or(ArtifactError::NotFound)
    }

    /// Look up by the string form used in URLs. Malformed ids are NotFound.
    pub async fn get_by_str(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<ArtifactRecord, ArtifactError> {
        let uuid = Uuid::parse_str(id).map_err(|_| ArtifactError::NotFound)?;
        self.get(uuid, now).await
    }

    /// Record a download. Only the first call sets `downloaded_at`.
    pub async fn mark_downloaded(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ArtifactRecord, ArtifactError> {
        let mut records = self.inner.records.write().await;

        let record = records
            .get_mut(&id)
            .filter(|record| !self.inner.expiry.is_expired(record, now))
            .ok_or(ArtifactError::NotFound)?;

        if record.mark_downloaded(now) {
            tracing::info!(
                artifact_id = %id,
                expires_at = %self.inner.expiry.expires_at(record),
                "Artifact downloaded"
            );
        }

        Ok(record.clone())
    }

    /// Remove an artifact and delete its files.
    ///
    /// Returns false if the id was not registered. Missing files are not an
    /// error; other deletion failures are logged and the record stays removed.
    pub async fn evict(&self, id: Uuid) -> bool {
        let removed = {
            let mut records = self.inner.records.write().await;
            records.remove(&id)
        };

        match removed {
            Some(record) => {
                delete_files(&record).await;
                tracing::info!(artifact_id = %id, "Evicted artifact");
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Evict every artifact past its deadline at `now`.
    ///
    /// The expiry decision and the removal happen under one write lock, so a
    /// download racing with the sweep either lands first (and extends the
    /// deadline) or finds the artifact gone.
    ///
    /// Returns the number of artifacts evicted.
    pub async fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let expired: Vec<ArtifactRecord> = {
            let mut records = self.inner.records.write().await;
            let ids: Vec<Uuid> = records
                .values()
                .filter(|record| self.inner.expiry.is_expired(record, now))
                .map(|record| record.id)
                .collect();
            ids.iter().filter_map(|id| records.remove(id)).collect()
        };

        let count = expired.len();
        for record in expired {
            delete_files(&record).await;
            tracing::debug!(
                artifact_id = %record.id,
                downloaded = record.downloaded,
                "Evicted expired artifact"
            );
        }

        if count > 0 {
            tracing::info!(count = count, "Cleaned up expired artifacts");
        }

        count
    }

    /// Evict everything. Used at shutdown.
    pub async fn purge(&self) -> usize {
        let all: Vec<ArtifactRecord> = {
            let mut records = self.inner.records.write().await;
            records.drain().map(|(_, record)| record).collect()
        };

        let count = all.len();
        for record in &all {
            delete_files(record).await;
        }

        if count > 0 {
            tracing::info!(count = count, "Purged all artifacts");
        }

        count
    }

    // ========================================================================
    // Query Methods
    // ========================================================================

    /// Number of registered records, including expired ones not yet swept
    pub async fn len(&self) -> usize {
        self.inner.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.records.read().await.is_empty()
    }
}

async fn delete_files(record: &ArtifactRecord) {
    remove_file_quietly(&record.source_path).await;
    remove_file_quietly(&record.result_path).await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use crate::split::{PageRange, RangePolicy};

    fn registry() -> ArtifactRegistry {
        ArtifactRegistry::new(ExpiryPolicy::new(
            Duration::from_secs(10 * 60),
            Duration::from_secs(5 * 60),
        ))
    }

    /// A record whose two files exist inside `dir`.
    fn record_with_files(dir: &Path, created_at: DateTime<Utc>) -> ArtifactRecord {
        let id = Uuid::new_v4();
        let source = dir.join(format!("{id}_input.pdf"));
        let result = dir.join(format!("{id}_split.pdf"));
        std::fs::write(&source, b"%PDF-source").unwrap();
        std::fs::write(&result, b"%PDF-result").unwrap();

        ArtifactRecord::new(
            id,
            source,
            result,
            format!("{id}_split.pdf"),
            PageRange::resolve(1, Some(2), 5, RangePolicy::Strict).unwrap(),
            2,
            created_at,
        )
    }

    fn at(t0: DateTime<Utc>, minutes: i64, seconds: i64) -> DateTime<Utc> {
        t0 + chrono::Duration::minutes(minutes) + chrono::Duration::seconds(seconds)
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let record = record_with_files(dir.path(), t0);

        let id = registry.register(record.clone()).await.unwrap();
        assert_eq!(id, record.id);

        let found = registry.get(id, t0).await.unwrap();
        assert_eq!(found.result_path, record.result_path);
        assert!(!found.downloaded);

        let by_str = registry.get_by_str(&id.to_string(), t0).await.unwrap();
        assert_eq!(by_str.id, id);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let record = record_with_files(dir.path(), Utc::now());

        registry.register(record.clone()).await.unwrap();
        let err = registry.register(record.clone()).await.unwrap_err();

        assert!(matches!(err, ArtifactError::Duplicate(id) if id == record.id));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let registry = registry();
        let now = Utc::now();

        assert!(matches!(
            registry.get(Uuid::new_v4(), now).await,
            Err(ArtifactError::NotFound)
        ));
        assert!(matches!(
            registry.get_by_str("../../etc/passwd", now).await,
            Err(ArtifactError::NotFound)
        ));
        assert!(matches!(
            registry.mark_downloaded(Uuid::new_v4(), now).await,
            Err(ArtifactError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_mark_downloaded_keeps_first_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let id = registry
            .register(record_with_files(dir.path(), t0))
            .await
            .unwrap();

        let first = registry.mark_downloaded(id, at(t0, 1, 0)).await.unwrap();
        let second = registry.mark_downloaded(id, at(t0, 2, 0)).await.unwrap();

        assert!(first.downloaded);
        assert_eq!(first.downloaded_at, Some(at(t0, 1, 0)));
        assert_eq!(second.downloaded_at, Some(at(t0, 1, 0)));
    }

    #[tokio::test]
    async fn test_evict_removes_record_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let record = record_with_files(dir.path(), t0);
        let id = registry.register(record.clone()).await.unwrap();

        assert!(registry.evict(id).await);

        assert!(!record.source_path.exists());
        assert!(!record.result_path.exists());
        assert!(matches!(registry.get(id, t0).await, Err(ArtifactError::NotFound)));

        // Evicting again is a no-op
        assert!(!registry.evict(id).await);
    }

    #[tokio::test]
    async fn test_evict_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let record = record_with_files(dir.path(), Utc::now());
        std::fs::remove_file(&record.result_path).unwrap();
        let id = registry.register(record.clone()).await.unwrap();

        assert!(registry.evict(id).await);
        assert!(!record.source_path.exists());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_undownloaded_artifact_expires_after_creation_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let record = record_with_files(dir.path(), t0);
        let id = registry.register(record.clone()).await.unwrap();

        // 9m59s: still served, sweep leaves it alone
        assert!(registry.get(id, at(t0, 9, 59)).await.is_ok());
        assert_eq!(registry.evict_expired(at(t0, 9, 59)).await, 0);
        assert!(record.result_path.exists());

        // 10m01s: gone before the sweep runs, and the sweep deletes the files
        assert!(registry.get(id, at(t0, 10, 1)).await.is_err());
        assert_eq!(registry.evict_expired(at(t0, 10, 1)).await, 1);
        assert!(!record.source_path.exists());
        assert!(!record.result_path.exists());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_download_moves_deadline_to_download_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let record = record_with_files(dir.path(), t0);
        let id = registry.register(record.clone()).await.unwrap();

        registry.mark_downloaded(id, at(t0, 8, 0)).await.unwrap();

        // The creation deadline no longer applies
        assert_eq!(registry.evict_expired(at(t0, 10, 1)).await, 0);
        assert!(registry.get(id, at(t0, 12, 59)).await.is_ok());
        assert_eq!(registry.evict_expired(at(t0, 12, 59)).await, 0);

        assert_eq!(registry.evict_expired(at(t0, 13, 1)).await, 1);
        assert!(registry.get(id, at(t0, 13, 1)).await.is_err());
        assert!(!record.result_path.exists());
    }

    #[tokio::test]
    async fn test_expired_artifact_cannot_be_marked_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let id = registry
            .register(record_with_files(dir.path(), t0))
            .await
            .unwrap();

        let result = registry.mark_downloaded(id, at(t0, 11, 0)).await;
        assert!(matches!(result, Err(ArtifactError::NotFound)));
    }

    #[tokio::test]
    async fn test_sweep_only_touches_expired_records() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let old = record_with_files(dir.path(), t0);
        let fresh = record_with_files(dir.path(), at(t0, 5, 0));
        registry.register(old.clone()).await.unwrap();
        registry.register(fresh.clone()).await.unwrap();

        assert_eq!(registry.evict_expired(at(t0, 12, 0)).await, 1);

        assert!(!old.result_path.exists());
        assert!(fresh.result_path.exists());
        assert!(registry.get(fresh.id, at(t0, 12, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let now = Utc::now();
        let records: Vec<_> = (0..3).map(|_| record_with_files(dir.path(), now)).collect();
        for record in &records {
            registry.register(record.clone()).await.unwrap();
        }

        assert_eq!(registry.purge().await, 3);
        assert!(registry.is_empty().await);
        assert!(records.iter().all(|r| !r.source_path.exists() && !r.result_path.exists()));
    }

    #[tokio::test]
    async fn test_concurrent_downloads_set_one_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let t0 = Utc::now();
        let id = registry
            .register(record_with_files(dir.path(), t0))
            .await
            .unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .mark_downloaded(id, at(t0, 1, i))
                        .await
                        .unwrap()
                        .downloaded_at
                })
            })
            .collect();

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }

        let stored = registry.get(id, at(t0, 1, 0)).await.unwrap().downloaded_at;
        assert!(stored.is_some());
        assert!(seen.iter().all(|t| *t == stored));
    }
}
