//! saveme-chunker entry point.

mod cli;
mod config;
mod transcript;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries messages and acks.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting saveme-chunker");

    let cli = cli::Cli::parse();
    let stdout = std::io::stdout();
    cli.run(&mut stdout.lock())
}
