//! Fedimirror binary entry point

use clap::Parser;
use fedimirror::cli::{Cli, Command};
use fedimirror::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Dispatch the CLI command; `run` starts the scheduler loops
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("FEDIMIRROR__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fedimirror=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "fedimirror=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    // 2. Load configuration
    let config = config::AppConfig::load()?;

    // 3. Initialize application state
    let state = AppState::new(config).await?;

    // 4. Dispatch
    match &cli.command {
        Command::Run => run_daemon(state).await,
        command => {
            if let Err(error) = fedimirror::cli::execute(command, &state).await {
                eprintln!("Error: {error}");
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Run the scheduler: imports on one interval loop, token-health checks
/// on another. Both run until the process is stopped; a failed pass is
/// logged and the loop waits for the next tick.
async fn run_daemon(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting Fedimirror...");

    spawn_token_health_task(state.clone());

    let interval_secs = state.config.import.interval_seconds.max(1);
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    tracing::info!(interval_seconds = interval_secs, "Import scheduler started");

    loop {
        // First tick fires immediately: one pass on startup, then the
        // configured cadence.
        interval.tick().await;

        match state.importer.sync().await {
            Ok(outcome) => {
                tracing::info!(
                    imported = outcome.imported,
                    skipped = outcome.skipped,
                    "Scheduled import completed"
                );
            }
            Err(error) => {
                tracing::error!(%error, "Scheduled import failed");
            }
        }
    }
}

/// Spawn the background token-health task
fn spawn_token_health_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.import.interval_seconds.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        // Consume the immediate first tick; the import loop already
        // verifies the token on startup.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.credentials.check_token_health().await {
                Ok(()) => tracing::debug!("Token health check passed"),
                Err(error) => tracing::warn!(%error, "Token health check failed"),
            }
        }
    });

    tracing::info!("Token health task spawned");
}
