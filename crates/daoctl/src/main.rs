//! Dao Control - CLI for the Dao tracker
//!
//! Local-first practice tracking themed around a cultivation
//! progression ladder. All state lives in JSON collection blobs under
//! the data directory; there is no daemon and no network.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::AppContext;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let today = chrono::Local::now().date_naive();
    let ctx = AppContext::open(args.data_dir, today).await?;

    match args.command {
        Commands::Paths => commands::paths(&ctx).await,
        Commands::Begin { dao_name } => commands::begin(&ctx, &dao_name, today).await,
        Commands::Show { path } => commands::show(&ctx, &path, today).await,
        Commands::Log { path, minutes } => commands::log(&ctx, &path, minutes, today).await,
        Commands::Rest { path } => commands::rest(&ctx, &path, today).await,
        Commands::History { path, window } => commands::history(&ctx, &path, window, today).await,
        Commands::Breakthrough { path } => commands::breakthrough(&ctx, &path, today).await,
        Commands::Remove { path } => commands::remove(&ctx, &path).await,
        Commands::Seed => commands::seed(&ctx, today).await,
    }
}
