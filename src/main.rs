// Sluice - Idempotent single-file ingestion
// Copyright (c) 2025 Sluice Contributors
// Licensed under the MIT License

use sluice::cli::commands::EXIT_FATAL;
use sluice::cli::{Cli, Commands};
use sluice::config::{load_config, LoggingConfig};
use sluice::logging::{init_logging, LoggingGuard};
use clap::Parser;
use std::process;

/// Conventional exit code for termination by signal
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    // Optional; a missing .env is ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Sluice - Idempotent single-file ingestion"
    );

    let exit_code = tokio::select! {
        result = execute_command(&cli) => match result {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "Command execution failed");
                eprintln!("Error: {e}");
                EXIT_FATAL
            }
        },
        _ = shutdown_signal() => {
            println!("\n⚠️  Shutdown signal received, aborting");
            EXIT_INTERRUPTED
        }
    };

    // process::exit skips destructors
    drop(guard);
    process::exit(exit_code);
}

/// Logging from the `[logging]` section when the configuration loads,
/// console only otherwise
fn setup_logging(cli: &Cli) -> sluice::domain::Result<LoggingGuard> {
    let (config_level, logging_config) = match (&cli.command, load_config(&cli.config)) {
        (Commands::Init(_), _) | (_, Err(_)) => ("info".to_string(), LoggingConfig::console_only()),
        (_, Ok(config)) => (config.application.log_level, config.logging),
    };
    let log_level = cli.log_level.clone().unwrap_or(config_level);

    match init_logging(&log_level, &logging_config) {
        Ok(guard) => Ok(guard),
        Err(e) if logging_config.local_enabled => {
            eprintln!("⚠️  File logging unavailable ({e}), logging to console only");
            init_logging(&log_level, &LoggingConfig::console_only())
        }
        Err(e) => Err(e),
    }
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT"),
                    _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Ingest(args) => args.execute(&cli.config).await,
        Commands::Move(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
