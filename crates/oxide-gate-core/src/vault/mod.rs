//! Credential vault: the encrypted roster of admins and operators.
//!
//! The roster is read-modify-written as one blob on every mutation. Role
//! lookups are served from the copy loaded at startup and refreshed after
//! each successful write.

mod cipher;

pub use cipher::RosterCipher;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Errors that can occur while reading or writing the roster
#[derive(Error, Debug)]
pub enum VaultError {
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Roster JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Encryption or decryption failed
    #[error("Crypto error: {0}")]
    Crypto(String),
    /// Key file content is not a valid key
    #[error("Key format error: {0}")]
    KeyFormat(String),
}

/// Privilege level of a caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Full access: roster management and scanning
    Admin,
    /// Scanning only
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Operator => f.write_str("operator"),
        }
    }
}

/// Roster blob content
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Admin user ids
    #[serde(default)]
    pub admins: Vec<i64>,
    /// Operator user ids
    #[serde(default)]
    pub operators: Vec<i64>,
}

impl Roster {
    /// Resolve the role of a user id. Admin wins over operator.
    #[must_use]
    pub fn role_of(&self, user_id: i64) -> Option<Role> {
        if self.admins.contains(&user_id) {
            Some(Role::Admin)
        } else if self.operators.contains(&user_id) {
            Some(Role::Operator)
        } else {
            None
        }
    }
}

/// Outcome of an idempotent roster mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RosterChange {
    /// The roster was changed and persisted
    Applied,
    /// The id was already present (add) or absent (remove); nothing written
    Unchanged,
}

/// Encrypted, file-backed roster store
pub struct RosterVault {
    users_path: PathBuf,
    cipher: RosterCipher,
    cached: RwLock<Roster>,
}

impl RosterVault {
    /// Open the vault, creating the key file if it does not exist yet.
    ///
    /// A missing, empty or unreadable roster blob yields an empty roster.
    ///
    /// # Errors
    ///
    /// Returns an error only if the key file cannot be loaded or created.
    pub async fn open(users_path: impl Into<PathBuf>, key_path: &Path) -> Result<Self, VaultError> {
        let cipher = RosterCipher::load_or_generate(key_path).await?;
        Ok(Self::with_cipher(users_path, cipher).await)
    }

    /// Open the vault with an explicit cipher.
    pub async fn with_cipher(users_path: impl Into<PathBuf>, cipher: RosterCipher) -> Self {
        let users_path = users_path.into();
        let roster = match read_roster(&users_path, &cipher).await {
            Ok(roster) => roster,
            Err(e) => {
                error!(path = %users_path.display(), error = %e, "Failed to load roster, falling back to empty roster");
                Roster::default()
            }
        };
        info!(
            admins = roster.admins.len(),
            operators = roster.operators.len(),
            "Roster loaded"
        );

        Self {
            users_path,
            cipher,
            cached: RwLock::new(roster),
        }
    }

    /// Role of a caller, `None` for unknown callers
    pub async fn role(&self, user_id: i64) -> Option<Role> {
        self.cached.read().await.role_of(user_id)
    }

    /// Snapshot of the current roster
    pub async fn roster(&self) -> Roster {
        self.cached.read().await.clone()
    }

    /// Add an admin. Adding an existing admin is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted roster cannot be read or written.
    pub async fn add_admin(&self, user_id: i64) -> Result<RosterChange, VaultError> {
        self.mutate(|roster| insert_unique(&mut roster.admins, user_id))
            .await
    }

    /// Add an operator. Adding an existing operator is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted roster cannot be read or written.
    pub async fn add_operator(&self, user_id: i64) -> Result<RosterChange, VaultError> {
        self.mutate(|roster| insert_unique(&mut roster.operators, user_id))
            .await
    }

    /// Remove an operator. Removing an absent id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted roster cannot be read or written.
    pub async fn remove_operator(&self, user_id: i64) -> Result<RosterChange, VaultError> {
        self.mutate(|roster| {
            let before = roster.operators.len();
            roster.operators.retain(|id| *id != user_id);
            if roster.operators.len() == before {
                RosterChange::Unchanged
            } else {
                RosterChange::Applied
            }
        })
        .await
    }

    /// Read the whole roster from disk, apply `change`, write it back.
    ///
    /// A failed read aborts the mutation so a transient error can never wipe
    /// the persisted roster. A failed write leaves the previous blob in place.
    async fn mutate<F>(&self, change: F) -> Result<RosterChange, VaultError>
    where
        F: FnOnce(&mut Roster) -> RosterChange,
    {
        let mut cached = self.cached.write().await;
        let mut roster = read_roster(&self.users_path, &self.cipher).await?;

        let outcome = change(&mut roster);
        if outcome == RosterChange::Applied {
            write_roster(&self.users_path, &self.cipher, &roster).await?;
            info!(
                admins = ?roster.admins,
                operators = ?roster.operators,
                "Roster saved"
            );
        }
        *cached = roster;
        Ok(outcome)
    }
}

fn insert_unique(ids: &mut Vec<i64>, user_id: i64) -> RosterChange {
    if ids.contains(&user_id) {
        RosterChange::Unchanged
    } else {
        ids.push(user_id);
        RosterChange::Applied
    }
}

async fn read_roster(path: &Path, cipher: &RosterCipher) -> Result<Roster, VaultError> {
    if !tokio::fs::try_exists(path).await? {
        warn!(path = %path.display(), "Roster file not found, waiting for the admin CLI to create it");
        return Ok(Roster::default());
    }
    let blob = tokio::fs::read(path).await?;
    if blob.is_empty() {
        return Ok(Roster::default());
    }
    let plaintext = cipher.open(&blob)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

async fn write_roster(path: &Path, cipher: &RosterCipher, roster: &Roster) -> Result<(), VaultError> {
    let blob = cipher.seal(&serde_json::to_vec(roster)?)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // Write next to the target and rename so a failed write never truncates
    // the previous blob.
    let tmp = path.with_extension("enc.tmp");
    tokio::fs::write(&tmp, blob).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
