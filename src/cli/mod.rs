//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Sluice using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Sluice - Idempotent single-file ingestion
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
#[command(author = "Sluice Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sluice.toml", env = "SLUICE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SLUICE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest one newly created file
    Ingest(commands::ingest::IngestArgs),

    /// Move one file between buckets
    Move(commands::mover::MoveArgs),

    /// Show the ledger record of one or more files
    Status(commands::status::StatusArgs),

    /// Validate configuration and pipeline settings
    ValidateConfig(commands::validate::ValidateArgs),

    /// Write sample configuration files
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_ingest_flags() {
        let cli = Cli::parse_from(["sluice", "ingest", "--bucket", "bkt", "--name", "a.csv"]);
        assert_eq!(cli.config, "sluice.toml");
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.bucket.as_deref(), Some("bkt"));
                assert_eq!(args.name.as_deref(), Some("a.csv"));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_ingest_event_conflicts_with_flags() {
        let result = Cli::try_parse_from([
            "sluice", "ingest", "--event", "-", "--bucket", "bkt", "--name", "a.csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_ingest_bucket_requires_name() {
        let result = Cli::try_parse_from(["sluice", "ingest", "--bucket", "bkt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_move_defaults_to_stdin() {
        let cli = Cli::parse_from(["sluice", "move"]);
        match cli.command {
            Commands::Move(args) => assert_eq!(args.message, "-"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config_and_log_level() {
        let cli = Cli::parse_from([
            "sluice",
            "--config",
            "custom.toml",
            "--log-level",
            "debug",
            "validate-config",
        ]);
        assert_eq!(cli.config, "custom.toml");
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_status_requires_files() {
        assert!(Cli::try_parse_from(["sluice", "status"]).is_err());
        let cli = Cli::parse_from(["sluice", "status", "a.csv", "b.csv"]);
        match cli.command {
            Commands::Status(args) => assert_eq!(args.files, vec!["a.csv", "b.csv"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["sluice", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
