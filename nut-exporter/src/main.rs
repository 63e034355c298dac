//! `nut-exporter` - Prometheus exporter for a UPS served by NUT
//!
//! Polls one device on a NUT `upsd` and exposes its variables on
//! `/metrics`. Configuration comes from a file plus command line overrides.

mod cli;
mod error;
mod server;

use std::sync::Arc;

use clap::Parser;
use cli::Cli;
use error::CliError;
use nut_exporter_core::{
    ConfigFile, ExporterConfig, MetricCatalog, MetricSynchronizer, PollScheduler, SeriesRegistry,
    init_tracing,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let file = ConfigFile::load(&cli.config)?;
    let config = ExporterConfig::merge(file, cli.overrides());

    if cli.show_config {
        println!("{config}");
        return Ok(());
    }
    config.validate()?;

    init_tracing(&cli.tracing_config())?;
    tracing::info!(
        ups = %config.ups_name,
        server = %config.address(),
        version = env!("CARGO_PKG_VERSION"),
        "Starting NUT exporter"
    );

    let listener = TcpListener::bind(cli.listen_address)
        .await
        .map_err(|e| CliError::Bind {
            address: cli.listen_address,
            reason: e.to_string(),
        })?;

    let registry = Arc::new(SeriesRegistry::new());
    let synchronizer = MetricSynchronizer::new(MetricCatalog::standard(), Arc::clone(&registry));
    let poller = PollScheduler::new(config.session(), synchronizer, config.refresh()).spawn();

    tracing::info!(address = %cli.listen_address, "Listening for scrapes");
    let result = server::serve(listener, registry, shutdown_signal()).await;

    poller.shutdown().await;
    tracing::info!("NUT exporter stopped");
    result
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown requested");
}
