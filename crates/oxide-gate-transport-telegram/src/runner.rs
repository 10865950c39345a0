use crate::bot::handlers::{self, Command};
use crate::bot::TelegramTransport;
use crate::config::BotSettings;
use oxide_gate_core::remote::RemoteAccount;
use oxide_gate_core::vault::RosterVault;
use oxide_gate_core::{Gate, GateContext, Sweeper};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// State that outlives dispatcher restarts.
///
/// The gate context owns the flow and session registries, so one runtime is
/// built per process and every dispatcher run shares it.
#[derive(Clone)]
pub struct BotRuntime {
    bot: Bot,
    ctx: Arc<GateContext>,
}

impl BotRuntime {
    /// Build the bot client and the shared gate context
    #[must_use]
    pub fn new(
        settings: &BotSettings,
        vault: Arc<RosterVault>,
        remote: Arc<dyn RemoteAccount>,
    ) -> Self {
        let bot = Bot::new(settings.telegram.telegram_token.clone());
        let transport = Arc::new(TelegramTransport::new(bot.clone()));
        let ctx = Arc::new(GateContext::new(
            settings.gate.as_ref(),
            vault,
            remote,
            transport,
        ));
        Self { bot, ctx }
    }

    /// Shared gate context
    #[must_use]
    pub fn context(&self) -> &Arc<GateContext> {
        &self.ctx
    }

    /// Create the sessions directory and start the lifecycle sweeper.
    /// The sweeper stops when `cancel` fires.
    pub async fn start_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        if let Err(e) = self.ctx.artifacts.ensure_dir().await {
            error!("Failed to create sessions directory: {}", e);
        }
        Sweeper::new(self.ctx.clone()).spawn(cancel)
    }

    /// Dispatch updates until the process receives Ctrl-C
    pub async fn dispatch(self) {
        let gate = Gate::new(self.ctx);
        let handler = setup_handler();

        info!("Bot is running...");

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![gate])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

fn setup_handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
}

async fn handle_command(gate: Gate, msg: Message, cmd: Command) -> anyhow::Result<()> {
    handlers::handle_command(&gate, &msg, cmd).await
}

async fn handle_text(gate: Gate, msg: Message) -> anyhow::Result<()> {
    Box::pin(handlers::handle_text(&gate, &msg)).await
}
