//! Scratch Storage
//!
//! Local directories holding uploaded originals and derived PDFs. Every file
//! here belongs to exactly one artifact and is named after its id, so stale
//! files from an earlier run can be recognised and removed at startup.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::StorageConfig;

const INPUT_SUFFIX: &str = "_input.pdf";
const OUTPUT_SUFFIX: &str = "_split.pdf";

#[derive(Debug, Clone)]
pub struct ScratchStorage {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl ScratchStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Create both directories and delete artifact files left behind by a
    /// previous process. Returns the number of files removed.
    pub async fn prepare(&self) -> io::Result<usize> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let mut removed = 0;
        removed += remove_leftovers(&self.upload_dir, INPUT_SUFFIX).await?;
        removed += remove_leftovers(&self.output_dir, OUTPUT_SUFFIX).await?;

        if removed > 0 {
            tracing::info!(count = removed, "Removed leftover artifact files");
        }
        Ok(removed)
    }

    /// Where the original upload for `id` lives
    pub fn input_path(&self, id: Uuid) -> PathBuf {
        self.upload_dir.join(format!("{id}{INPUT_SUFFIX}"))
    }

    /// Where the derived PDF for `id` lives
    pub fn output_path(&self, id: Uuid) -> PathBuf {
        self.output_dir.join(format!("{id}{OUTPUT_SUFFIX}"))
    }

    /// Filename offered to the downloader
    pub fn display_name(id: Uuid) -> String {
        format!("{id}{OUTPUT_SUFFIX}")
    }

    /// Claim both paths for a submission that is not registered yet.
    pub fn pending(&self, id: Uuid) -> PendingArtifact {
        PendingArtifact {
            input: self.input_path(id),
            output: self.output_path(id),
            armed: true,
        }
    }
}

/// Files of a submission in progress.
///
/// Until [`keep`](Self::keep) is called, dropping this deletes both files.
/// That covers error returns and handler futures dropped mid-request, when
/// no record exists yet for the sweeper to find.
#[derive(Debug)]
pub struct PendingArtifact {
    input: PathBuf,
    output: PathBuf,
    armed: bool,
}

impl PendingArtifact {
    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Hand the files over to a registry record.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingArtifact {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed abandoned file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete file")
                }
            }
        }
    }
}

/// Delete a file, treating "already gone" as success.
///
/// Other failures are logged and swallowed; the return value says whether
/// the file is known to be absent afterwards.
pub async fn remove_file_quietly(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to delete file");
            false
        }
    }
}

async fn remove_leftovers(dir: &Path, suffix: &str) -> io::Result<usize> {
    let mut count = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let is_artifact = name
            .to_str()
            .and_then(|n| n.strip_suffix(suffix))
            .is_some_and(|stem| Uuid::parse_str(stem).is_ok());

        if is_artifact && remove_file_quietly(&entry.path()).await {
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(root: &Path) -> ScratchStorage {
        ScratchStorage::new(&StorageConfig {
            upload_dir: root.join("uploads"),
            output_dir: root.join("outputs"),
        })
    }

    #[tokio::test]
    async fn test_prepare_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());

        assert_eq!(storage.prepare().await.unwrap(), 0);
        assert!(dir.path().join("uploads").is_dir());
        assert!(dir.path().join("outputs").is_dir());
    }

    #[tokio::test]
    async fn test_prepare_removes_only_artifact_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());
        storage.prepare().await.unwrap();

        let id = Uuid::new_v4();
        std::fs::write(storage.input_path(id), b"old").unwrap();
        std::fs::write(storage.output_path(id), b"old").unwrap();
        let unrelated = dir.path().join("outputs").join("notes_split.pdf");
        std::fs::write(&unrelated, b"keep").unwrap();

        assert_eq!(storage.prepare().await.unwrap(), 2);
        assert!(!storage.input_path(id).exists());
        assert!(!storage.output_path(id).exists());
        assert!(unrelated.exists());
    }

    #[tokio::test]
    async fn test_dropped_pending_artifact_removes_its_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());
        storage.prepare().await.unwrap();

        let pending = storage.pending(Uuid::new_v4());
        std::fs::write(pending.input(), b"partial upload").unwrap();
        let (input, output) = (pending.input().to_path_buf(), pending.output().to_path_buf());

        // Output was never written; its absence is not an error
        drop(pending);
        assert!(!input.exists());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_kept_pending_artifact_leaves_files_alone() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(dir.path());
        storage.prepare().await.unwrap();

        let pending = storage.pending(Uuid::new_v4());
        std::fs::write(pending.input(), b"upload").unwrap();
        std::fs::write(pending.output(), b"split").unwrap();
        let (input, output) = (pending.input().to_path_buf(), pending.output().to_path_buf());

        pending.keep();
        assert!(input.exists());
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_file_quietly(&dir.path().join("never-existed.pdf")).await);
    }

    #[test]
    fn test_paths_are_named_after_the_id() {
        let storage = storage_in(Path::new("/srv"));
        let id = Uuid::nil();

        assert_eq!(
            storage.input_path(id),
            PathBuf::from("/srv/uploads/00000000-0000-0000-0000-000000000000_input.pdf")
        );
        assert_eq!(
            ScratchStorage::display_name(id),
            "00000000-0000-0000-0000-000000000000_split.pdf"
        );
    }
}
