//! Status command implementation
//!
//! Prints the ledger record of each requested file.

use super::{exit_code, EXIT_CONFIG, EXIT_OK};
use crate::adapters::factory::create_record_store;
use crate::config::load_config;
use crate::core::ledger::StatusLedger;
use crate::domain::{FileId, IngestionRecord};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// File identifiers to look up
    #[arg(required = true)]
    pub files: Vec<String>,
}

/// One table row for a file
pub fn describe(file_id: &FileId, record: Option<&IngestionRecord>) -> String {
    let (status, when, detail) = match record {
        None => ("Not ingested".to_string(), "-".to_string(), String::new()),
        Some(r) => {
            let status = match r.success {
                Some(true) => "✅ Ingested",
                Some(false) => "❌ Failed",
                None => "Not ingested",
            };
            let when = r
                .when
                .map(|w| w.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let detail = match (&r.error_message, r.duplication_attempts.len()) {
                (Some(message), _) => message.clone(),
                (None, 0) => String::new(),
                (None, n) => format!("{n} duplicate attempt(s)"),
            };
            (status.to_string(), when, detail)
        }
    };

    format!("{:<40} {:<15} {:<20} {}", file_id, status, when, detail)
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        println!("📊 Ingestion Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let store = match create_record_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to connect to the status ledger");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };
        let ledger = StatusLedger::new(store, &config.ingest.ledger_collection);

        println!(
            "{:<40} {:<15} {:<20} {}",
            "File", "Status", "When (UTC)", "Detail"
        );
        println!("{}", "-".repeat(100));

        for name in &self.files {
            let file_id = match FileId::new(name.as_str()) {
                Ok(f) => f,
                Err(e) => {
                    println!("❌ {e}");
                    return Ok(EXIT_CONFIG);
                }
            };

            match ledger.get(&file_id).await {
                Ok(record) => println!("{}", describe(&file_id, record.as_ref())),
                Err(e) => {
                    println!("❌ Failed to read ledger record for '{file_id}'");
                    println!("   Error: {e}");
                    return Ok(exit_code(&e));
                }
            }
        }

        println!();
        Ok(EXIT_OK)
    }
}
