//! Filesystem-backed checkpoint store.
//!
//! The record is kept as a single JSON document, `agent_state.json`, inside the
//! agent's data directory:
//!
//! ```json
//! { "version": 1, "data": { "registration_identity": "...", "cluster": "...", "hardware_instance_id": "..." } }
//! ```
//!
//! Saves go to a sibling temp file that is synced and then renamed over the
//! document, so a crash mid-save leaves either the old or the new record.

use async_trait::async_trait;
use fleet_core::effects::{CheckpointFactory, CheckpointStore};
use fleet_core::{CheckpointError, CheckpointLayout, PersistedState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Name of the checkpoint document inside the data directory.
pub const CHECKPOINT_FILE_NAME: &str = "agent_state.json";

const CHECKPOINT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct CheckpointDocument<'a> {
    version: u32,
    data: &'a PersistedState,
}

#[derive(Debug, Deserialize)]
struct RawCheckpointDocument {
    version: u32,
    data: serde_json::Value,
}

/// Opens filesystem checkpoint stores rooted at a data directory
#[derive(Debug, Clone)]
pub struct FilesystemCheckpointFactory {
    data_dir: PathBuf,
}

impl FilesystemCheckpointFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[async_trait]
impl CheckpointFactory for FilesystemCheckpointFactory {
    async fn open(
        &self,
        layout: &CheckpointLayout,
    ) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
        layout.ensure_complete()?;

        fs::create_dir_all(&self.data_dir).await.map_err(|e| {
            CheckpointError::unavailable(format!(
                "failed to create data directory {}: {e}",
                self.data_dir.display()
            ))
        })?;

        Ok(Arc::new(FilesystemCheckpointStore::new(&self.data_dir)))
    }
}

/// Checkpoint store persisting a single JSON document
#[derive(Debug, Clone)]
pub struct FilesystemCheckpointStore {
    path: PathBuf,
    temp_path: PathBuf,
}

impl FilesystemCheckpointStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(CHECKPOINT_FILE_NAME),
            temp_path: data_dir.join(format!("{CHECKPOINT_FILE_NAME}.tmp")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(bytes: &[u8]) -> Result<PersistedState, CheckpointError> {
        let raw: RawCheckpointDocument = serde_json::from_slice(bytes)
            .map_err(|e| CheckpointError::corrupt(format!("unreadable document: {e}")))?;

        if raw.version > CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: raw.version,
                supported: CHECKPOINT_VERSION,
            });
        }

        serde_json::from_value(raw.data)
            .map_err(|e| CheckpointError::corrupt(format!("invalid state record: {e}")))
    }

    async fn replace_with(&self, bytes: &[u8]) -> Result<(), CheckpointError> {
        let mut file = fs::File::create(&self.temp_path).await.map_err(|e| {
            CheckpointError::write_failed(format!(
                "failed to create {}: {e}",
                self.temp_path.display()
            ))
        })?;
        file.write_all(bytes)
            .await
            .map_err(|e| CheckpointError::write_failed(format!("failed to write file: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| CheckpointError::write_failed(format!("failed to sync file: {e}")))?;
        drop(file);

        fs::rename(&self.temp_path, &self.path).await.map_err(|e| {
            CheckpointError::write_failed(format!(
                "failed to move checkpoint into place at {}: {e}",
                self.path.display()
            ))
        })
    }

    async fn discard_temp(&self) {
        match fs::remove_file(&self.temp_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.temp_path.display(),
                error = %e,
                "failed to remove partial checkpoint"
            ),
        }
    }

    /// Persist the rename itself. Not every platform can open a directory for
    /// syncing, so failures are only logged.
    async fn sync_data_dir(&self) {
        let Some(dir) = self.path.parent() else {
            return;
        };
        let result = match fs::File::open(dir).await {
            Ok(handle) => handle.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(path = %dir.display(), error = %e, "unable to sync data directory");
        }
    }
}

#[async_trait]
impl CheckpointStore for FilesystemCheckpointStore {
    async fn load(&self) -> Result<PersistedState, CheckpointError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no checkpoint on disk");
                return Ok(PersistedState::default());
            }
            Err(e) => {
                return Err(CheckpointError::read_failed(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let state = Self::decode(&bytes)?;
        tracing::debug!(path = %self.path.display(), "loaded checkpoint");
        Ok(state)
    }

    async fn save(&self, state: &PersistedState) -> Result<(), CheckpointError> {
        let document = CheckpointDocument {
            version: CHECKPOINT_VERSION,
            data: state,
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| CheckpointError::write_failed(format!("failed to encode state: {e}")))?;

        if let Err(e) = self.replace_with(&bytes).await {
            self.discard_temp().await;
            return Err(e);
        }
        self.sync_data_dir().await;

        tracing::debug!(path = %self.path.display(), "saved checkpoint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use fleet_core::CheckpointSlot;

    fn full_layout() -> CheckpointLayout {
        let mut layout = CheckpointLayout::new();
        for slot in CheckpointSlot::ALL {
            layout.register(slot).unwrap();
        }
        layout
    }

    #[tokio::test]
    async fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FilesystemCheckpointFactory::new(dir.path());
        let store = factory.open(&full_layout()).await.unwrap();

        let state = store.load().await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn saved_state_is_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FilesystemCheckpointFactory::new(dir.path().join("nested/data"));
        let store = factory.open(&full_layout()).await.unwrap();

        let state = PersistedState::new("arn-1".into(), "prod".into(), "i-123");
        store.save(&state).await.unwrap();

        let reopened = factory.open(&full_layout()).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), state);
        assert!(!dir
            .path()
            .join("nested/data")
            .join(format!("{CHECKPOINT_FILE_NAME}.tmp"))
            .exists());
    }

    #[tokio::test]
    async fn failed_save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the document path makes the final rename fail
        std::fs::create_dir(dir.path().join(CHECKPOINT_FILE_NAME)).unwrap();
        let store = FilesystemCheckpointStore::new(dir.path());

        let state = PersistedState::new("arn-1".into(), "prod".into(), "i-123");
        assert_matches!(store.save(&state).await, Err(CheckpointError::WriteFailed(_)));
        assert!(!dir
            .path()
            .join(format!("{CHECKPOINT_FILE_NAME}.tmp"))
            .exists());
        assert!(dir.path().join(CHECKPOINT_FILE_NAME).is_dir());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CHECKPOINT_FILE_NAME), b"{ not json").unwrap();
        let store = FilesystemCheckpointStore::new(dir.path());

        assert_matches!(store.load().await, Err(CheckpointError::Corrupt(_)));
    }

    #[tokio::test]
    async fn newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CHECKPOINT_FILE_NAME),
            br#"{"version": 7, "data": {}}"#,
        )
        .unwrap();
        let store = FilesystemCheckpointStore::new(dir.path());

        assert_matches!(
            store.load().await,
            Err(CheckpointError::UnsupportedVersion {
                found: 7,
                supported: 1
            })
        );
    }

    #[tokio::test]
    async fn incomplete_layout_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FilesystemCheckpointFactory::new(dir.path());
        let mut layout = CheckpointLayout::new();
        layout.register(CheckpointSlot::Cluster).unwrap();

        assert_matches!(
            factory.open(&layout).await.err(),
            Some(CheckpointError::MissingSlot { .. })
        );
    }

    #[tokio::test]
    async fn unusable_data_dir_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let factory = FilesystemCheckpointFactory::new(blocker.join("data"));

        assert_matches!(
            factory.open(&full_layout()).await.err(),
            Some(CheckpointError::Unavailable(_))
        );
    }
}
