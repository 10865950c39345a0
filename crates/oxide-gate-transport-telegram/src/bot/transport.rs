//! Telegram Bot API transport.

use super::views::render_keyboard;
use async_trait::async_trait;
use oxide_gate_core::transport::{ChatRef, Keyboard, MessageRef, Transport, TransportError};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId};
use tracing::debug;

/// [`Transport`] backed by a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn reply(
        &self,
        chat: ChatRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let mut request = self.bot.send_message(ChatId(chat), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(render_keyboard(&keyboard));
        }
        let message = request
            .await
            .map_err(|e| TransportError(format!("Telegram send error: {e}")))?;
        Ok(message.id.0)
    }

    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(chat), MessageId(message))
            .await
            .map_err(|e| TransportError(format!("Telegram delete error: {e}")))?;
        debug!(chat_id = chat, message_id = message, "Message deleted");
        Ok(())
    }

    async fn send_document(&self, chat: ChatRef, path: &Path) -> Result<(), TransportError> {
        self.bot
            .send_document(ChatId(chat), InputFile::file(path.to_path_buf()))
            .await
            .map_err(|e| TransportError(format!("Telegram upload error: {e}")))?;
        Ok(())
    }
}
