//! Fleet node agent
//!
//! Runs one bootstrap pass and exits with a code the supervisor understands:
//! 0 once the node is ready and shut down cleanly, 1 when a restart may help,
//! 5 when it will not.

use anyhow::{Context, Result};
use clap::Parser;
use fleet_agent::{BootstrapBuilder, BootstrapOrchestrator, ShutdownSignal};
use fleet_core::effects::CancellationToken;
use fleet_core::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn assemble(cli: &Cli, shutdown: &ShutdownSignal) -> Result<BootstrapOrchestrator> {
    let config = cli.load_config().context("failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let orchestrator = BootstrapBuilder::production(&config)
        .context("failed to wire agent")?
        .with_cancellation(shutdown.cancellation_token())
        .build()?;
    Ok(orchestrator)
}

fn spawn_signal_handler(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                shutdown.trigger();
            }
            Err(e) => tracing::warn!(error = %e, "unable to listen for shutdown signal"),
        }
    });
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let shutdown = ShutdownSignal::new();
    spawn_signal_handler(shutdown.clone());

    let mut orchestrator = match assemble(&cli, &shutdown) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            // Misconfiguration does not fix itself on restart
            tracing::error!(error = %format!("{e:#}"), "agent startup failed");
            return ExitCode::Terminal.into();
        }
    };

    let outcome = orchestrator.run().await;
    if outcome.is_ready() {
        tracing::info!("node ready; waiting for shutdown");
        shutdown.cancellation_token().cancelled().await;
    }

    let code = outcome.exit_code();
    tracing::info!(exit_code = code.code(), "fleet agent exiting");
    code.into()
}
