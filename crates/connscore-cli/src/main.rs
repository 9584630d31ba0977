mod cli;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(&cli);
    if let Some(Command::Historical(args)) = &cli.command {
        config.apply_historical(args);
    }

    // Initialize tracing
    // --quiet wins, then --debug (flag or config), then RUST_LOG
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if config.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;

    match cli.command.unwrap_or(Command::Daily) {
        Command::Daily => commands::cmd_daily(&config, cli.quiet).await,
        Command::Date { date } => commands::cmd_date(&config, date, cli.quiet).await,
        Command::Historical(args) => commands::cmd_historical(&config, &args, cli.quiet).await,
        Command::GenerateJson => commands::cmd_generate_json(&config, cli.quiet),
        Command::Migrate => commands::cmd_migrate(&config, cli.quiet),
    }
}
