//! Persisted remote credential artifacts.
//!
//! The remote client stores one or more files per logical session
//! (`session_<hash>.session`, journals, ...). All of them share the prefix
//! derived from the [`SessionKey`].

use crate::phone::SessionKey;
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};

/// Extension of the primary credential file
pub const ARTIFACT_EXTENSION: &str = "session";

/// Directory of credential artifacts
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Use `dir` as the artifact directory
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the artifact directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Path of the primary credential file of a session
    #[must_use]
    pub fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.dir
            .join(format!("{}.{ARTIFACT_EXTENSION}", key.artifact_prefix()))
    }

    /// Whether the primary credential file exists
    pub async fn exists(&self, key: &SessionKey) -> bool {
        tokio::fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    /// Delete every file whose name starts with the session prefix.
    ///
    /// Individual failures are logged and skipped. Returns the number of
    /// removed files.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory cannot be listed.
    pub async fn purge(&self, key: &SessionKey) -> io::Result<usize> {
        let prefix = key.artifact_prefix();
        let mut removed = 0;

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    info!(target: "oxide_gate::session", path = %path.display(), "Removed expired session artifact");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove session artifact"),
            }
        }
        Ok(removed)
    }
}
