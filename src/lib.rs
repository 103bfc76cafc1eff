// Sluice - Idempotent single-file ingestion
// Copyright (c) 2025 Sluice Contributors
// Licensed under the MIT License

//! # Sluice - Idempotent single-file ingestion
//!
//! Sluice loads each newly created file in an object storage bucket into an
//! analytical table store at most once, records the outcome per file in a
//! document-store ledger, and publishes a success or failure notification.
//! A companion mover relocates files between buckets on request.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Ledger, load strategies, orchestrator, notifier, mover
//! - [`adapters`] - Storage and messaging traits with their concrete backends
//! - [`domain`] - Identifiers, records, trigger payloads, errors
//! - [`config`] - Deployment configuration and pipeline settings
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sluice::adapters::factory::create_backends;
//! use sluice::cli::commands::ingest::build_orchestrator;
//! use sluice::config::{load_config, PipelineSettings};
//! use sluice::domain::{BucketName, FileId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("sluice.toml")?;
//!     let settings = PipelineSettings::load(&config.application.settings_path)?;
//!     let backends = create_backends(&config).await?;
//!
//!     let orchestrator = build_orchestrator(&config, &settings, &backends);
//!     let outcome = orchestrator
//!         .ingest(&BucketName::new("landing")?, &FileId::new("a.csv")?)
//!         .await?;
//!
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Idempotence
//!
//! A file whose ledger record says `success = true` is never loaded again; the
//! re-trigger is appended to the record's `duplication_attempts` instead. A
//! failed file is retried on its next trigger.
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`] with [`domain::SluiceError`].
//! Load failures are not errors: they are recorded and published, and the
//! orchestrator returns [`core::ingest::IngestOutcome::Failed`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
