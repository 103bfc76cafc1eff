//! Init command implementation
//!
//! Writes a sample `sluice.toml` and `config.ini`.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path of the deployment configuration to create
    #[arg(short, long, default_value = "sluice.toml")]
    pub output: String,

    /// Path of the pipeline settings file to create
    #[arg(long, default_value = "config.ini")]
    pub settings_output: String,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, settings = %self.settings_output, "Initializing configuration");

        println!("📝 Initializing Sluice configuration");
        println!();

        for path in [&self.output, &self.settings_output] {
            if Path::new(path).exists() && !self.force {
                println!("❌ File already exists: {path}");
                println!("   Use --force to overwrite");
                return Ok(EXIT_CONFIG);
            }
        }

        let files = [
            (&self.output, Self::generate_config(&self.settings_output)),
            (&self.settings_output, Self::generate_settings()),
        ];
        for (path, contents) in files {
            if let Err(e) = fs::write(path, contents) {
                println!("❌ Failed to write {path}");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
            println!("✅ Created: {path}");
        }

        println!();
        println!("Next steps:");
        println!("  1. Edit {} with your project, dataset and topics", self.settings_output);
        println!("  2. Create a .env file with your credentials:");
        println!("     - SLUICE_COSMOS_KEY");
        println!("     - SLUICE_PG_URL");
        println!("  3. Validate configuration: sluice validate-config");
        println!("  4. Ingest a file: sluice ingest --bucket <bucket> --name <file>");
        println!();
        Ok(EXIT_OK)
    }

    fn generate_config(settings_path: &str) -> String {
        format!(
            r#"# Sluice Configuration File
# Idempotent single-file ingestion

[application]
log_level = "info"
settings_path = "{settings_path}"
# In-memory ledger, tables and notifications
dry_run = false

[ingest]
# external_table | bulk_load | streaming_insert
load_strategy = "external_table"
table_prefix = "dc"
ledger_collection = "streaming_files"
streaming_deadline_seconds = 30

[mover]
# Overridden by SOURCE_BUCKET / DESTINATION_BUCKET
# source_bucket = "gs://landing"
# destination_bucket = "gs://archive"

[gcs]
endpoint = "https://storage.googleapis.com"
# access_token = "${{SLUICE_GCS_TOKEN}}"
timeout_seconds = 60

[pubsub]
endpoint = "https://pubsub.googleapis.com"
# access_token = "${{SLUICE_PUBSUB_TOKEN}}"
timeout_seconds = 60

[cosmosdb]
endpoint = "https://your-account.documents.azure.com:443/"
key = "${{SLUICE_COSMOS_KEY}}"
database_name = "sluice"
request_timeout_seconds = 60

[postgresql]
connection_string = "${{SLUICE_PG_URL}}"
max_connections = 10
connection_timeout_seconds = 30
statement_timeout_seconds = 300
ssl_mode = "require"
foreign_server = "sluice_files"
external_root = "/mnt/buckets"

[logging]
local_enabled = true
local_path = "/var/log/sluice"
local_rotation = "daily"
"#
        )
    }

    fn generate_settings() -> String {
        r#"devshell_project_id = your-project
dataset = chain
streaming_error_topic = ingest-errors
streaming_success_topic = ingest-success
"#
        .to_string()
    }
}
