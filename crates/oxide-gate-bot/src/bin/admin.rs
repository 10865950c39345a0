//! Roster bootstrap tool.
//!
//! The bot only answers callers already in the roster, so the first admin
//! has to be added from the host before the bot is started.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use oxide_gate_bot::logging::{init_logging, RedactionPatterns};
use oxide_gate_core::config::GateSettings;
use oxide_gate_core::vault::{RosterChange, RosterVault};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "oxide-gate-admin")]
#[command(about = "Manage the Oxide Gate roster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grant admin rights to a Telegram user id
    AddAdmin {
        /// Numeric Telegram user id
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    /// Print admins and operators
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging(Arc::new(RedactionPatterns::new()?));

    let cli = Cli::parse();
    let settings = GateSettings::new().context("failed to load gate configuration")?;
    let vault = RosterVault::open(settings.users_file(), &settings.key_file())
        .await
        .context("failed to open the roster vault")?;

    match cli.command {
        Commands::AddAdmin { id } => match vault.add_admin(id).await? {
            RosterChange::Applied => println!("User {id} is now an admin."),
            RosterChange::Unchanged => println!("User {id} is already an admin."),
        },
        Commands::List => {
            let roster = vault.roster().await;
            println!("Admins: {}", join_ids(&roster.admins));
            println!("Operators: {}", join_ids(&roster.operators));
        }
    }

    Ok(())
}

fn join_ids(ids: &[i64]) -> String {
    if ids.is_empty() {
        return "none".to_string();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
