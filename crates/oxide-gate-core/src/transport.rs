//! Bot transport capability.
//!
//! The core never talks to a chat platform directly. It sends replies,
//! deletes messages and uploads files through [`Transport`], and every call
//! goes through [`Notifier`], which swallows and logs failures so the state
//! machine never branches on transport errors.

use crate::vault::Role;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Identifier of a caller (bot user id)
pub type Caller = i64;
/// Identifier of a bot chat
pub type ChatRef = i64;
/// Identifier of a message inside a bot chat
pub type MessageRef = i32;

/// Transport-level failure
#[derive(Error, Debug, Clone)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Reply keyboard attached to an outgoing message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Role-specific main menu
    MainMenu(Role),
    /// Single cancel button
    Cancel,
    /// One button per choice, followed by a cancel button
    Choices(Vec<String>),
}

/// Interface for bot transports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message, returning its id
    async fn reply(
        &self,
        chat: ChatRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, TransportError>;

    /// Delete a message
    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), TransportError>;

    /// Upload a local file as a document
    async fn send_document(&self, chat: ChatRef, path: &Path) -> Result<(), TransportError>;
}

/// Best-effort wrapper around a [`Transport`]
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
}

impl Notifier {
    /// Wrap a transport
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send a message. Returns the message id, or `None` if sending failed.
    pub async fn say(&self, chat: ChatRef, text: &str, keyboard: Option<Keyboard>) -> Option<MessageRef> {
        match self.transport.reply(chat, text, keyboard).await {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(chat_id = chat, error = %e, "Failed to send reply");
                None
            }
        }
    }

    /// Delete a message. Returns whether the deletion succeeded.
    pub async fn discard(&self, chat: ChatRef, message: MessageRef) -> bool {
        match self.transport.delete_message(chat, message).await {
            Ok(()) => true,
            Err(e) => {
                warn!(chat_id = chat, message_id = message, error = %e, "Failed to delete message");
                false
            }
        }
    }

    /// Upload a document. Returns whether the upload succeeded.
    pub async fn upload(&self, chat: ChatRef, path: &Path) -> bool {
        match self.transport.send_document(chat, path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(chat_id = chat, path = %path.display(), error = %e, "Failed to send document");
                false
            }
        }
    }
}
