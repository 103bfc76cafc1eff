//! Validate config command implementation
//!
//! Loads both configuration layers and prints a summary.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::config::{load_config, redact_connection_string, PipelineSettings};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let settings = match PipelineSettings::load(&config.application.settings_path) {
            Ok(s) => {
                println!(
                    "✅ Pipeline settings loaded from {}",
                    config.application.settings_path
                );
                s
            }
            Err(e) => {
                println!(
                    "❌ Failed to load pipeline settings from {}",
                    config.application.settings_path
                );
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Load Strategy: {}", config.ingest.load_strategy);
        println!("  Table Prefix: {}", config.ingest.table_prefix);
        println!("  Ledger Collection: {}", config.ingest.ledger_collection);
        println!("  Dataset: {}", settings.dataset);
        println!("  Success Topic: {}", settings.success_topic_path());
        println!("  Error Topic: {}", settings.error_topic_path());
        println!("  Storage Endpoint: {}", config.gcs.endpoint);

        if let Some(ref cosmos_config) = config.cosmosdb {
            println!("  Cosmos DB Endpoint: {}", cosmos_config.endpoint);
            println!("  Cosmos DB Database: {}", cosmos_config.database_name);
        }
        if let Some(ref pg_config) = config.postgresql {
            println!(
                "  PostgreSQL Connection: {}",
                redact_connection_string(&pg_config.connection_string)
            );
            println!("  Max Connections: {}", pg_config.max_connections);
        }

        match (&config.mover.source_bucket, &config.mover.destination_bucket) {
            (Some(source), Some(destination)) => {
                println!("  Mover: {source} -> {destination}");
            }
            _ => println!("  Mover: not configured"),
        }
        println!();

        Ok(EXIT_OK)
    }
}
