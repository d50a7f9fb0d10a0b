#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use mendforge::cli::Cli;
use mendforge::{Config, app};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS before any client is
    // built; without it reqwest cannot pick between aws-lc-rs and ring.
    if let Err(err) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: failed to install default crypto provider: {err:?}");
    }

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let config = Config::load(cli.config.as_deref())?;
    app::dispatch(cli, config).await
}
