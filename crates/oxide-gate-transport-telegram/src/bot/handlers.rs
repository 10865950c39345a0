use anyhow::Result;
use oxide_gate_core::{Gate, Inbound};
use teloxide::{prelude::*, utils::command::BotCommands};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Convert a Telegram message into gate input
#[must_use]
pub fn inbound(msg: &Message) -> Inbound {
    Inbound::new(
        get_user_id_safe(msg),
        msg.chat.id.0,
        msg.id.0,
        msg.text().unwrap_or_default(),
    )
}

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the usage warning and the main menu
    #[command(description = "Show the main menu.")]
    Start,
    /// Abort the current operation
    #[command(description = "Cancel the current operation.")]
    Cancel,
}

/// Route a command to the gate
///
/// # Errors
///
/// Never fails today; transport errors are swallowed inside the gate.
pub async fn handle_command(gate: &Gate, msg: &Message, cmd: Command) -> Result<()> {
    let input = inbound(msg);
    match cmd {
        Command::Start => gate.handle_start(&input).await,
        Command::Cancel => gate.handle_cancel(&input).await,
    }
    Ok(())
}

/// Route a plain text message to the gate
///
/// # Errors
///
/// Never fails today; transport errors are swallowed inside the gate.
pub async fn handle_text(gate: &Gate, msg: &Message) -> Result<()> {
    gate.handle_text(&inbound(msg)).await;
    Ok(())
}
