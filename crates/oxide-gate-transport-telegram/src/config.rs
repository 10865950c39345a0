//! Telegram transport settings.

use config::ConfigError;
use oxide_gate_core::config::GateSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("telegram_token", &"[TELEGRAM_TOKEN]")
            .finish()
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is empty.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = oxide_gate_core::config::build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that cannot start a bot.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the token is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::NotFound("telegram_token".to_string()));
        }
        Ok(())
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone, Debug)]
pub struct BotSettings {
    /// Gate settings shared across transport handlers.
    pub gate: Arc<GateSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(gate: GateSettings, telegram: TelegramSettings) -> Self {
        Self {
            gate: Arc::new(gate),
            telegram: Arc::new(telegram),
        }
    }
}
