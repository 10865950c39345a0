//! Ephemeral message tracker.
//!
//! Login flows exchange secrets (phone, verification code, 2FA password)
//! through the bot chat. Every such message is recorded here and deleted
//! once the flow no longer needs it.

use crate::transport::{ChatRef, MessageRef, Notifier};
use tracing::debug;

/// Author of a tracked message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Sent by the caller
    Caller,
    /// Sent by the bot
    Bot,
}

/// Deletion worklist entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedMessage {
    /// Chat holding the message
    pub chat: ChatRef,
    /// Message id
    pub message: MessageRef,
    /// Author
    pub origin: MessageOrigin,
}

/// Append-only list of messages pending deletion
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageTracker {
    entries: Vec<TrackedMessage>,
}

impl MessageTracker {
    /// Record a message
    pub fn record(&mut self, chat: ChatRef, message: MessageRef, origin: MessageOrigin) {
        self.entries.push(TrackedMessage {
            chat,
            message,
            origin,
        });
    }

    /// Number of tracked messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empty the list and return its content
    pub fn take(&mut self) -> Vec<TrackedMessage> {
        std::mem::take(&mut self.entries)
    }
}

/// Best-effort deletion of tracked messages.
///
/// Each failure is logged by the notifier and does not stop the remaining
/// deletions. Returns the number of messages actually deleted.
pub async fn purge(notifier: &Notifier, messages: Vec<TrackedMessage>) -> usize {
    let total = messages.len();
    let mut deleted = 0;
    for entry in messages {
        if notifier.discard(entry.chat, entry.message).await {
            deleted += 1;
        }
    }
    if total > 0 {
        debug!(deleted, total, "Purged tracked messages");
    }
    deleted
}
