//! KafClaw CLI — process wiring and the stdin/stdout channel adapter for
//! the KafClaw Agent Core (a demo frontend; the gateway itself is
//! channel-agnostic, with a CLI as one of several possible channel
//! adapters). A single binary with no daemon/JSON-RPC split: the Agent
//! Loop runs in-process over an inbound bus, not from a separate gateway
//! process.

#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use anyhow::Result;
use clap::Parser;

mod channel;
mod cli;
mod commands;
mod config_bridge;
mod theme;
mod wiring;

use cli::{AuditCommands, Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let workspace_root = match &cli.workspace {
        Some(path) => std::path::PathBuf::from(path),
        None => std::env::current_dir()?,
    };

    let config = kafclaw_config::Config::load(Some(&workspace_root)).unwrap_or_default();

    let mut log_config = config_bridge::to_log_config(&config);
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    if let Err(e) = kafclaw_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => commands::run::run(config, workspace_root, args).await?,
        Commands::Init => commands::init::run_init()?,
        Commands::Doctor => commands::doctor::run_doctor(&workspace_root).await?,
        Commands::Audit { command } => match command {
            AuditCommands::Verify => commands::audit::verify_audit_chain(&workspace_root)?,
        },
    }

    Ok(())
}
