use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use oxide_gate_bot::logging::{init_logging, RedactionPatterns};
use oxide_gate_bot::mtproto::GrammersAccount;
use oxide_gate_core::artifacts::ArtifactStore;
use oxide_gate_core::config::GateSettings;
use oxide_gate_core::remote::RemoteAccount;
use oxide_gate_core::vault::RosterVault;
use oxide_gate_transport_telegram::config::{BotSettings, TelegramSettings};
use oxide_gate_transport_telegram::runner::BotRuntime;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const RESTART_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv().ok();

    // Patterns must exist before the subscriber is installed
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Oxide Gate bot...");

    let settings = init_settings();

    let api_id = settings
        .gate
        .api_id
        .ok_or_else(|| anyhow!("API_ID is not set"))?;
    let api_hash = settings
        .gate
        .api_hash
        .clone()
        .ok_or_else(|| anyhow!("API_HASH is not set"))?;

    let vault = Arc::new(
        RosterVault::open(settings.gate.users_file(), &settings.gate.key_file())
            .await
            .context("failed to open the roster vault")?,
    );
    let remote: Arc<dyn RemoteAccount> = Arc::new(GrammersAccount::new(
        api_id,
        api_hash,
        ArtifactStore::new(settings.gate.sessions_dir()),
    ));

    let runtime = BotRuntime::new(&settings, vault, remote);
    let cancel = CancellationToken::new();
    // Stops the sweeper however this function exits
    let _sweeper_guard = cancel.clone().drop_guard();
    let sweeper = runtime.start_sweeper(cancel.clone()).await;

    loop {
        let task = tokio::spawn(runtime.clone().dispatch());
        match task.await {
            Ok(()) => {
                info!("Bot stopped.");
                break;
            }
            Err(e) => {
                error!("Bot crashed: {}", e);
                warn!("Restarting in {} seconds...", RESTART_DELAY.as_secs());
                tokio::time::sleep(RESTART_DELAY).await;
            }
        }
    }

    cancel.cancel();
    if let Err(e) = sweeper.await {
        error!("Sweeper task failed: {}", e);
    }

    Ok(())
}

fn init_settings() -> Arc<BotSettings> {
    let gate_settings = match GateSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load gate configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telegram_settings = match TelegramSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load telegram configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully.");
    Arc::new(BotSettings::new(gate_settings, telegram_settings))
}
