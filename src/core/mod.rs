//! Core business logic for Sluice.
//!
//! # Modules
//!
//! - [`ledger`] - Per-file ingestion status, the at-most-once guard
//! - [`ingest`] - Load strategies and the ingestion orchestrator
//! - [`notify`] - Success and failure notifications
//! - [`mover`] - Relocating a blob between buckets
//! - [`clock`] - Time source
//!
//! # Ingestion Workflow
//!
//! 1. **Check**: Look up the file in the status ledger
//! 2. **Duplicate**: If already ingested, append the attempt and stop
//! 3. **Load**: Run the configured load strategy
//! 4. **Record**: Overwrite the ledger record with the outcome
//! 5. **Notify**: Publish to the success or error topic
//!
//! # Example
//!
//! ```rust,no_run
//! use sluice::adapters::memory::{MemoryPublisher, MemoryRecordStore, MemoryTableStore};
//! use sluice::core::clock::SystemClock;
//! use sluice::core::ingest::{ExternalTableStrategy, IngestSettings, IngestionOrchestrator};
//! use sluice::core::ledger::{StatusLedger, DEFAULT_COLLECTION};
//! use sluice::core::notify::Notifier;
//! use sluice::domain::{BucketName, FileId};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = IngestionOrchestrator::new(
//!     StatusLedger::new(Arc::new(MemoryRecordStore::new()), DEFAULT_COLLECTION),
//!     Arc::new(ExternalTableStrategy::new(Arc::new(MemoryTableStore::new()))),
//!     Notifier::new(
//!         Arc::new(MemoryPublisher::new()),
//!         "projects/p/topics/ok",
//!         "projects/p/topics/err",
//!     ),
//!     IngestSettings {
//!         dataset: "chain".to_string(),
//!         table_prefix: "dc".to_string(),
//!     },
//!     Arc::new(SystemClock),
//! );
//!
//! let outcome = orchestrator
//!     .ingest(&BucketName::new("landing")?, &FileId::new("a.csv")?)
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod ingest;
pub mod ledger;
pub mod mover;
pub mod notify;
