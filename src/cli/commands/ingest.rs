//! Ingest command implementation
//!
//! Handles one file-created event: checks the ledger, loads the file with the
//! configured strategy, records the outcome and publishes it.

use super::{exit_code, read_input, EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use crate::adapters::factory::{create_backends, Backends};
use crate::config::{load_config, PipelineSettings, SluiceConfig};
use crate::core::clock::SystemClock;
use crate::core::ingest::{create_strategy, IngestOutcome, IngestSettings, IngestionOrchestrator};
use crate::core::ledger::StatusLedger;
use crate::core::notify::Notifier;
use crate::domain::{BucketName, FileCreatedEvent, FileId, Result, SluiceError};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// File-created event as JSON (`{"bucket": ..., "name": ...}`), or `-` for stdin
    #[arg(long, conflicts_with_all = ["bucket", "name"])]
    pub event: Option<String>,

    /// Bucket holding the new file
    #[arg(long, requires = "name")]
    pub bucket: Option<String>,

    /// Object name of the new file
    #[arg(long, requires = "bucket")]
    pub name: Option<String>,

    /// Use in-memory ledger, tables and publisher
    #[arg(long)]
    pub dry_run: bool,
}

impl IngestArgs {
    /// Resolves the file to ingest from the event or the explicit flags
    pub fn target(&self) -> Result<(BucketName, FileId)> {
        match (&self.event, &self.bucket, &self.name) {
            (Some(source), _, _) => {
                let body = read_input(source)?;
                FileCreatedEvent::from_json(&body)?.target()
            }
            (None, Some(bucket), Some(name)) => Ok((
                BucketName::new(bucket.as_str()).map_err(SluiceError::Validation)?,
                FileId::new(name.as_str()).map_err(SluiceError::Validation)?,
            )),
            _ => Err(SluiceError::Validation(
                "either --event or both --bucket and --name are required".to_string(),
            )),
        }
    }

    /// Execute the ingest command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let (bucket, file_id) = match self.target() {
            Ok(t) => t,
            Err(e) => {
                println!("❌ Invalid trigger payload");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };
        if self.dry_run {
            config.application.dry_run = true;
        }

        let settings = match PipelineSettings::load(&config.application.settings_path) {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to load pipeline settings");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let backends = match create_backends(&config).await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to connect to backends");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };

        let orchestrator = build_orchestrator(&config, &settings, &backends);

        if config.application.dry_run {
            println!("🔍 DRY RUN: ledger, tables and notifications stay in memory");
        }

        match orchestrator.ingest(&bucket, &file_id).await {
            Ok(IngestOutcome::Loaded(report)) => {
                println!("✅ File '{file_id}' ingested into {}", report.target);
                if let Some(rows) = report.rows {
                    println!("   Rows: {rows}");
                }
                Ok(EXIT_OK)
            }
            Ok(IngestOutcome::Duplicate) => {
                println!("⏭️  File '{file_id}' was already ingested, attempt recorded");
                Ok(EXIT_OK)
            }
            Ok(IngestOutcome::Failed { message }) => {
                println!("⚠️  Ingestion failed, outcome recorded and published");
                println!("   {message}");
                Ok(EXIT_OK)
            }
            Err(e) => {
                crate::log_error_with_context!(&e, "Ingestion aborted");
                println!("❌ Ingestion aborted");
                println!("   Error: {e}");
                Ok(match exit_code(&e) {
                    EXIT_CONFIG => EXIT_FATAL,
                    code => code,
                })
            }
        }
    }
}

/// Wires the orchestrator from configuration and backends
pub fn build_orchestrator(
    config: &SluiceConfig,
    settings: &PipelineSettings,
    backends: &Backends,
) -> IngestionOrchestrator {
    let strategy = create_strategy(
        config.ingest.load_strategy,
        backends.blobs.clone(),
        backends.tables.clone(),
        Duration::from_secs(config.ingest.streaming_deadline_seconds),
    );

    IngestionOrchestrator::new(
        StatusLedger::new(backends.records.clone(), &config.ingest.ledger_collection),
        strategy,
        Notifier::new(
            backends.publisher.clone(),
            settings.success_topic_path(),
            settings.error_topic_path(),
        ),
        IngestSettings {
            dataset: settings.dataset.clone(),
            table_prefix: config.ingest.table_prefix.clone(),
        },
        Arc::new(SystemClock),
    )
}
