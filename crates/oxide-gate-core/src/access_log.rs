//! Access-violation log
//!
//! Unauthorized callers never get a reply. Their attempts are appended to a
//! dedicated file so probing can be audited without revealing the bot.

use crate::transport::Caller;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, warn};

/// Maximum number of characters of the offending text kept in the log
const DETAIL_MAX_CHARS: usize = 200;

/// Append-only access-violation log file
pub struct AccessLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AccessLog {
    /// Log into `path`; parent directories are created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Log file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one violation. Failures are logged and swallowed.
    pub async fn record(&self, caller: Caller, detail: &str) {
        let detail: String = detail.chars().take(DETAIL_MAX_CHARS).collect();
        let detail = detail.replace('\n', " ");
        warn!(target: "oxide_gate::access", user_id = caller, "{detail}");

        let line = format!(
            "{} | user_id={caller} | {detail}\n",
            Local::now().to_rfc3339()
        );
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.append(line.as_bytes()).await {
            error!(path = %self.path.display(), error = %e, "Failed to write access-violation log");
        }
    }

    async fn append(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await
    }
}
