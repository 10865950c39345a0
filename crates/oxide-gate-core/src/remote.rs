//! Remote account capability.
//!
//! Everything the gate needs from the third-party messaging account is
//! expressed here. Dialog and participant objects are normalized at this
//! boundary into [`ChatSummary`] and [`Participant`] before they reach the
//! flow state machine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors reported by the remote account
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// A credential artifact for this phone already exists but is not tracked
    #[error("session already exists")]
    AlreadyExists,
    /// The remote side rejected the request
    #[error("remote error: {0}")]
    Rpc(String),
    /// The remote account could not be reached or is not usable
    #[error("remote account unavailable: {0}")]
    Unavailable(String),
}

/// Result of submitting a verification code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeOutcome {
    /// The handle is authenticated
    Authenticated,
    /// The account has a second factor; a password is required
    PasswordRequired,
}

/// Kind of a remote chat
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    /// Private conversation with a user or bot
    Private,
    /// Basic group or supergroup
    Group,
    /// Broadcast channel
    Channel,
}

/// Normalized remote dialog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSummary {
    /// Remote chat id
    pub id: i64,
    /// Display title (empty when the remote side has none)
    pub title: String,
    /// Chat kind
    pub kind: ChatKind,
}

impl ChatSummary {
    /// Whether this chat can be offered for export
    #[must_use]
    pub fn is_exportable(&self) -> bool {
        matches!(self.kind, ChatKind::Group | ChatKind::Channel) && !self.title.is_empty()
    }
}

/// Normalized chat participant
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Participant {
    /// Remote user id
    pub id: i64,
    /// Whether the participant administers the chat
    pub is_admin: bool,
    /// Username without the `@` prefix
    pub username: Option<String>,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: Option<String>,
    /// Phone as reported by the remote side
    pub phone: Option<String>,
    /// Date the participant joined the chat
    pub joined_at: Option<DateTime<Utc>>,
}

/// Connected handle to the remote account
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Submit the verification code received by the account owner
    async fn sign_in_with_code(&self, code: &str) -> Result<CodeOutcome, RemoteError>;

    /// Submit the second-factor password
    async fn sign_in_with_password(&self, password: &str) -> Result<(), RemoteError>;

    /// Fetch up to `limit` dialogs
    async fn list_chats(&self, limit: usize) -> Result<Vec<ChatSummary>, RemoteError>;

    /// Fetch up to `limit` participants of a chat previously returned by
    /// [`RemoteSession::list_chats`]
    async fn participants(&self, chat_id: i64, limit: usize) -> Result<Vec<Participant>, RemoteError>;

    /// Close the connection. Safe to call more than once.
    async fn disconnect(&self);
}

/// Factory for remote handles
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteAccount: Send + Sync {
    /// Connect and request a verification code for a normalized phone.
    ///
    /// Returns [`RemoteError::AlreadyExists`] if a credential artifact for the
    /// phone already exists; it is never overwritten.
    async fn request_code(&self, phone: &str) -> Result<Box<dyn RemoteSession>, RemoteError>;

    /// Reconnect using the persisted credential of a phone and confirm that
    /// it is still authorized.
    async fn resume(&self, phone: &str) -> Result<Box<dyn RemoteSession>, RemoteError>;
}
