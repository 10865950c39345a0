//! Flow state machine
//!
//! One [`FlowRecord`] per caller describes the multi-step operation the
//! caller is in: the login protocol, chat selection, or a roster edit. The
//! records live in [`FlowStore`]; the message handler takes a record out,
//! advances it outside the lock and puts the successor back.

mod export;
pub(crate) mod machine;

use crate::remote::{ChatSummary, RemoteSession};
use crate::tracker::{self, MessageOrigin, MessageTracker, TrackedMessage};
use crate::transport::{Caller, ChatRef, MessageRef, Notifier};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;

/// Sub-state of a login flow
pub enum LoginStep {
    /// Waiting for the phone number
    Phone,
    /// Waiting for the verification code
    Code {
        /// Normalized phone
        phone: String,
        /// Handle that requested the code
        handle: Box<dyn RemoteSession>,
    },
    /// Waiting for the second-factor password
    Password {
        /// Normalized phone
        phone: String,
        /// Handle that accepted the code
        handle: Box<dyn RemoteSession>,
    },
}

/// Operation a caller is in, with exactly the data that operation needs
pub enum FlowAction {
    /// Remote login
    Login(LoginStep),
    /// Authenticated; waiting for the chat to export
    ChooseChat {
        /// Authenticated handle
        handle: Box<dyn RemoteSession>,
        /// Chats presented as buttons
        candidates: Vec<ChatSummary>,
    },
    /// Waiting for the id of a new admin
    AddAdmin,
    /// Waiting for the id of a new operator
    AddOperator,
    /// Waiting for the id of the operator to remove
    RemoveOperator,
}

/// Payload-free discriminant of a [`FlowAction`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    /// `Login(Phone)`
    LoginPhone,
    /// `Login(Code)`
    LoginCode,
    /// `Login(Password)`
    LoginPassword,
    /// `ChooseChat`
    ChooseChat,
    /// `AddAdmin`
    AddAdmin,
    /// `AddOperator`
    AddOperator,
    /// `RemoveOperator`
    RemoveOperator,
}

impl FlowAction {
    /// Discriminant of this action
    #[must_use]
    pub const fn kind(&self) -> FlowKind {
        match self {
            Self::Login(LoginStep::Phone) => FlowKind::LoginPhone,
            Self::Login(LoginStep::Code { .. }) => FlowKind::LoginCode,
            Self::Login(LoginStep::Password { .. }) => FlowKind::LoginPassword,
            Self::ChooseChat { .. } => FlowKind::ChooseChat,
            Self::AddAdmin => FlowKind::AddAdmin,
            Self::AddOperator => FlowKind::AddOperator,
            Self::RemoveOperator => FlowKind::RemoveOperator,
        }
    }

    /// Retained remote handle, if any
    #[must_use]
    pub fn handle(&self) -> Option<&dyn RemoteSession> {
        match self {
            Self::Login(LoginStep::Code { handle, .. } | LoginStep::Password { handle, .. })
            | Self::ChooseChat { handle, .. } => Some(handle.as_ref()),
            _ => None,
        }
    }

    /// Consume the action, returning its remote handle
    #[must_use]
    pub fn into_handle(self) -> Option<Box<dyn RemoteSession>> {
        match self {
            Self::Login(LoginStep::Code { handle, .. } | LoginStep::Password { handle, .. })
            | Self::ChooseChat { handle, .. } => Some(handle),
            _ => None,
        }
    }
}

impl FlowKind {
    /// Whether messages exchanged in this flow carry login secrets
    #[must_use]
    pub const fn tracks_messages(self) -> bool {
        matches!(
            self,
            Self::LoginPhone | Self::LoginCode | Self::LoginPassword | Self::ChooseChat
        )
    }
}

/// Part of a record that survives from one step to the next
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowMeta {
    /// Creation time of the flow; never reset by later steps
    pub started_at: DateTime<Utc>,
    /// Messages pending deletion
    pub tracked: MessageTracker,
}

impl FlowMeta {
    /// Meta of a flow started at `now`
    #[must_use]
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            tracked: MessageTracker::default(),
        }
    }
}

/// In-progress operation of one caller
pub struct FlowRecord {
    /// Current step
    pub action: FlowAction,
    /// Start time and tracked messages
    pub meta: FlowMeta,
}

impl FlowRecord {
    /// New record started at `now`
    #[must_use]
    pub fn new(action: FlowAction, now: DateTime<Utc>) -> Self {
        Self {
            action,
            meta: FlowMeta::started(now),
        }
    }

    /// Successor record continuing the same logical session
    #[must_use]
    pub const fn resume(action: FlowAction, meta: FlowMeta) -> Self {
        Self { action, meta }
    }

    /// Discriminant of the current step
    #[must_use]
    pub const fn kind(&self) -> FlowKind {
        self.action.kind()
    }

    /// Whether the record is older than `ttl` at `now`
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.meta.started_at > ttl
    }
}

impl fmt::Debug for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowRecord")
            .field("kind", &self.kind())
            .field("started_at", &self.meta.started_at)
            .field("tracked", &self.meta.tracked.len())
            .finish()
    }
}

/// Tear a flow down: disconnect any retained handle, then purge tracked
/// messages. Shared by cancel, errors, completion and sweeper expiry.
pub async fn teardown(notifier: &Notifier, action: FlowAction, meta: FlowMeta) {
    release(notifier, action.into_handle(), meta).await;
}

/// [`teardown`] for a record already split into its handle and meta
pub async fn release(notifier: &Notifier, handle: Option<Box<dyn RemoteSession>>, meta: FlowMeta) {
    if let Some(handle) = handle {
        handle.disconnect().await;
    }
    let mut tracked = meta.tracked;
    tracker::purge(notifier, tracked.take()).await;
}

/// Lock-guarded map of flow records keyed by caller
#[derive(Default)]
pub struct FlowStore {
    records: Mutex<HashMap<Caller, FlowRecord>>,
}

impl FlowStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, returning the one it replaced
    pub async fn insert(&self, caller: Caller, record: FlowRecord) -> Option<FlowRecord> {
        self.records.lock().await.insert(caller, record)
    }

    /// Remove and return the record of a caller
    pub async fn take(&self, caller: Caller) -> Option<FlowRecord> {
        self.records.lock().await.remove(&caller)
    }

    /// Whether the caller has a record
    pub async fn contains(&self, caller: Caller) -> bool {
        self.records.lock().await.contains_key(&caller)
    }

    /// Step the caller is in
    pub async fn kind_of(&self, caller: Caller) -> Option<FlowKind> {
        self.records.lock().await.get(&caller).map(FlowRecord::kind)
    }

    /// Start time of the caller's record
    pub async fn started_at(&self, caller: Caller) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .await
            .get(&caller)
            .map(|record| record.meta.started_at)
    }

    /// Track a message if the caller is in a login-related flow.
    /// Returns whether the message was recorded.
    pub async fn record_message(
        &self,
        caller: Caller,
        chat: ChatRef,
        message: MessageRef,
        origin: MessageOrigin,
    ) -> bool {
        let mut records = self.records.lock().await;
        match records.get_mut(&caller) {
            Some(record) if record.kind().tracks_messages() => {
                record.meta.tracked.record(chat, message, origin);
                true
            }
            _ => false,
        }
    }

    /// Empty the caller's worklist and return it. The record itself stays.
    pub async fn take_tracked(&self, caller: Caller) -> Vec<TrackedMessage> {
        self.records
            .lock()
            .await
            .get_mut(&caller)
            .map(|record| record.meta.tracked.take())
            .unwrap_or_default()
    }

    /// Remove and return every record older than `ttl` at `now`
    pub async fn remove_stale(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<(Caller, FlowRecord)> {
        let mut records = self.records.lock().await;
        let stale: Vec<Caller> = records
            .iter()
            .filter(|(_, record)| record.is_stale(now, ttl))
            .map(|(caller, _)| *caller)
            .collect();
        stale
            .into_iter()
            .filter_map(|caller| records.remove(&caller).map(|record| (caller, record)))
            .collect()
    }

    /// Number of callers with a record
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Whether no caller has a record
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}
