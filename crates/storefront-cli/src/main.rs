//! Storefront CLI
//!
//! Order from the shop or administer it from the terminal.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use storefront_cli::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn,storefront=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut out = std::io::stdout().lock();
    let mut err = std::io::stderr().lock();
    storefront_cli::commands::run(cli, &mut out, &mut err).await?;
    Ok(())
}
