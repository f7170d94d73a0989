mod cli;
mod config;
mod model;
mod reconcile;
mod tracker;
mod usage;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("JFT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "jft=debug,warn" } else { "jft=info,warn" })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    cli::run(cli).await
}
