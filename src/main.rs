mod api;
mod cli;
mod config;
mod error;
mod gate;
mod listing;
mod logging;
mod model;
mod orchestrator;
mod policy_list;
mod poller;
mod reconcile;
mod sort;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let settings = config::load_settings(&args.overrides())?;
    logging::init(&settings, args.is_interactive())?;
    tracing::debug!(base_url = %settings.base_url, poll_interval = ?settings.poll_interval, "settings resolved");

    cli::run(args, settings).await
}
