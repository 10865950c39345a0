//! Remote session registry
//!
//! Tracks authenticated remote handles by [`SessionKey`] with a fixed
//! lifetime. Entries are never extended: re-authentication replaces the entry
//! wholesale with a fresh window, and the sweeper removes entries whose
//! window has elapsed.

use crate::phone::SessionKey;
use crate::transport::Caller;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

/// Authenticated remote session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEntry {
    /// Session key derived from the phone
    pub key: SessionKey,
    /// Caller who authenticated it
    pub owner: Caller,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// `created_at + ttl`, fixed at creation
    pub expires_at: DateTime<Utc>,
}

impl SessionEntry {
    /// Whether the entry has expired at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Lock-guarded map of session entries
pub struct SessionRegistry {
    ttl: Duration,
    entries: Mutex<HashMap<SessionKey, SessionEntry>>,
}

impl SessionRegistry {
    /// Create an empty registry with the given entry lifetime
    #[must_use]
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a session at the current time
    pub async fn put(&self, key: SessionKey, owner: Caller) -> SessionEntry {
        self.put_at(key, owner, Utc::now()).await
    }

    /// Register a session created at `now`, replacing any previous entry
    pub async fn put_at(&self, key: SessionKey, owner: Caller, now: DateTime<Utc>) -> SessionEntry {
        let entry = SessionEntry {
            key: key.clone(),
            owner,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.entries.lock().await.insert(key, entry.clone());
        info!(
            target: "oxide_gate::session",
            session = %entry.key,
            user_id = owner,
            expires_at = %entry.expires_at,
            "Session registered"
        );
        entry
    }

    /// Look up a session
    pub async fn get(&self, key: &SessionKey) -> Option<SessionEntry> {
        self.entries.lock().await.get(key).cloned()
    }

    /// Look up a session that is still inside its window at `now`.
    /// Expired entries the sweeper has not reached yet count as absent.
    pub async fn get_live(&self, key: &SessionKey, now: DateTime<Utc>) -> Option<SessionEntry> {
        self.entries
            .lock()
            .await
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned()
    }

    /// Remove and return every entry with `expires_at <= now`
    pub async fn remove_expired(&self, now: DateTime<Utc>) -> Vec<SessionEntry> {
        let mut entries = self.entries.lock().await;
        let expired: Vec<SessionKey> = entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| entries.remove(&key))
            .collect()
    }

    /// Number of registered sessions
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
