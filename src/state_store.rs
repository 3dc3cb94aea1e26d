//! Durable storage of the scan high-water-mark.

use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};

use crate::{error::StateStoreError, types::ScanState};

/// Default location of the state file.
pub const DEFAULT_STATE_PATH: &str = "listener_state.json";

/// Durable home of [`ScanState`].
///
/// `persist` must be atomic: a reader sees either the previous record or the new one, never a
/// partial write.
pub trait StateStore: Send + Sync {
    /// Returns `Ok(None)` when no state was ever persisted.
    ///
    /// # Errors
    ///
    /// [`StateStoreError::Corrupted`] when a record exists but cannot be parsed, and
    /// [`StateStoreError::Io`] when it cannot be read at all.
    fn load(&self) -> impl Future<Output = Result<Option<ScanState>, StateStoreError>> + Send;

    fn persist(&self, state: &ScanState)
    -> impl Future<Output = Result<(), StateStoreError>> + Send;
}

/// JSON file store using write-to-temp then rename.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write_temp(&self, temp: &Path, contents: &[u8]) -> Result<(), StateStoreError> {
        let mut file = fs::File::create(temp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok(())
    }
}

impl Default for FileStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_PATH)
    }
}

impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<ScanState>, StateStoreError> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state = serde_json::from_slice::<ScanState>(&contents).map_err(|e| {
            StateStoreError::Corrupted { path: self.path.clone(), reason: e.to_string() }
        })?;
        Ok(Some(state))
    }

    async fn persist(&self, state: &ScanState) -> Result<(), StateStoreError> {
        let contents =
            serde_json::to_vec(state).map_err(|e| StateStoreError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        if let Err(e) = self.write_temp(&temp, &contents).await {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }

        fs::rename(&temp, &self.path).await?;
        trace!(last_processed_block = state.last_processed_block, "Scan state persisted");
        Ok(())
    }
}
