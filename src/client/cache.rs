use crate::client::{Snapshot, SyncError};
use anyhow::Context;
use std::io::ErrorKind;
use std::path::PathBuf;

/// JSON file holding the last state the client saw from the task API
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalCache { path: path.into() }
    }

    /// Reads the cached snapshot. A missing file means nothing has been cached yet.
    pub async fn load(&self) -> Result<Option<Snapshot>, SyncError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(SyncError::Cache(anyhow::Error::new(err).context(format!(
                    "reading cache file {}",
                    self.path.display()
                ))));
            }
        };

        let snapshot = serde_json::from_slice(&contents)
            .with_context(|| format!("parsing cache file {}", self.path.display()))
            .map_err(SyncError::Cache)?;

        Ok(Some(snapshot))
    }

    /// Replaces the cached snapshot
    pub async fn store(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        let serialized = serde_json::to_vec_pretty(snapshot)
            .context("serializing client state")
            .map_err(SyncError::Cache)?;

        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating cache directory {}", parent.display()))
                .map_err(SyncError::Cache)?;
        }

        tokio::fs::write(&self.path, serialized)
            .await
            .with_context(|| format!("writing cache file {}", self.path.display()))
            .map_err(SyncError::Cache)
    }
}
