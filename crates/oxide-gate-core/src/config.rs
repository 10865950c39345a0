//! Configuration and settings management
//!
//! Loads settings from environment variables and config files and defines the
//! lifecycle policy constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Lifetime of an authenticated remote session and of an abandoned flow (15 minutes).
pub const SESSION_TTL_SECS: u64 = 900;
/// Pause between two sweeper passes.
pub const SWEEP_INTERVAL_SECS: u64 = 30;
/// Maximum number of dialogs fetched from the remote account.
pub const DIALOG_FETCH_LIMIT: usize = 200;
/// Maximum number of chats presented as selectable buttons.
pub const CHAT_BUTTON_LIMIT: usize = 25;
/// Maximum number of members exported from one chat.
pub const MEMBER_EXPORT_LIMIT: usize = 100;

/// Name of the encrypted roster blob inside the data directory.
pub const USERS_FILE_NAME: &str = "users.enc";
/// Name of the symmetric key file inside the data directory.
pub const KEY_FILE_NAME: &str = "secret.key";
/// Name of the access-violation log inside the log directory.
pub const WRONG_ACCESS_LOG_NAME: &str = "wrong_access.log";

/// Build the layered configuration shared by every settings struct.
///
/// # Errors
///
/// Returns a `ConfigError` if a source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables map onto snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

/// Gate settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GateSettings {
    /// MTProto application id
    pub api_id: Option<i32>,
    /// MTProto application hash
    pub api_hash: Option<String>,
    /// Root directory for the roster, key, session artifacts and logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Session and flow lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Sweeper interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./users_data")
}

const fn default_session_ttl() -> u64 {
    SESSION_TTL_SECS
}

const fn default_sweep_interval() -> u64 {
    SWEEP_INTERVAL_SECS
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            data_dir: default_data_dir(),
            session_ttl_secs: SESSION_TTL_SECS,
            sweep_interval_secs: SWEEP_INTERVAL_SECS,
        }
    }
}

impl GateSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;

        // Numeric env values sometimes fail the automatic mapping
        if settings.api_id.is_none() {
            if let Ok(val) = std::env::var("API_ID") {
                settings.api_id = val.trim().parse().ok();
            }
        }
        if settings.api_hash.is_none() {
            if let Ok(val) = std::env::var("API_HASH") {
                if !val.is_empty() {
                    settings.api_hash = Some(val);
                }
            }
        }

        Ok(settings)
    }

    /// Lifetime shared by session entries and flow records
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Pause between sweeper passes
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Path of the encrypted roster blob
    #[must_use]
    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE_NAME)
    }

    /// Path of the symmetric key file
    #[must_use]
    pub fn key_file(&self) -> PathBuf {
        self.data_dir.join(KEY_FILE_NAME)
    }

    /// Directory holding remote credential artifacts
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    /// Directory holding log files
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Scratch directory for generated export files
    #[must_use]
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    /// Path of the access-violation log
    #[must_use]
    pub fn wrong_access_log(&self) -> PathBuf {
        self.log_dir().join(WRONG_ACCESS_LOG_NAME)
    }
}
