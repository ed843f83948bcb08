//! Wallet ledger daemon binary

use std::error::Error;
use wallet_core::{Config, Ledger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting wallet ledger daemon");

    // Config file path as first argument, env overrides otherwise
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    tracing::info!(
        data_dir = %config.data_dir.display(),
        metrics_addr = %config.metrics_listen_addr,
        "Configuration loaded"
    );

    // Open ledger
    let ledger = Ledger::open(config).await?;
    tracing::info!("Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down wallet ledger daemon");
    ledger.shutdown().await?;
    Ok(())
}
