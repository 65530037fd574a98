//! `azdo-store` operator binary.
//!
//! Reads `azdo-store.toml` (or the path given with `--config`), opens the
//! SQLite store, and runs one subcommand against it. Listings are printed as
//! JSON.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use azdo_core::Store;
use azdo_store_sqlite::SqliteKv;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, config::CliConfig};

#[derive(Parser)]
#[command(author, version, about = "Inspect and edit the Azure DevOps bridge store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "azdo-store.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;
  let store_path = cfg.resolved_store_path();

  let backend = SqliteKv::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Command::PurgeExpired = cli.command {
    let removed = backend.purge_expired().await?;
    tracing::info!(removed, "purged expired keys");
    return Ok(());
  }

  let store = Store::new(backend)
    .with_retry_policy(cfg.retry_policy())
    .with_oauth_state_ttl(cfg.oauth_state_ttl());

  commands::run(&store, cli.command).await
}
