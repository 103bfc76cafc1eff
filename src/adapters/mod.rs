//! External system integrations for Sluice.
//!
//! - [`traits`] - the storage and messaging interfaces the pipeline depends on
//! - [`gcs`] - Cloud Storage JSON API blob store
//! - [`pubsub`] - Pub/Sub REST publisher
//! - [`cosmosdb`] - Azure Cosmos DB record store (status ledger)
//! - [`postgresql`] - PostgreSQL table store
//! - [`memory`] - in-memory implementations for tests and dry runs
//! - [`factory`] - builds the configured implementation of each trait
//!
//! # Example
//!
//! ```rust,no_run
//! use sluice::adapters::factory::create_backends;
//! use sluice::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sluice.toml")?;
//! let backends = create_backends(&config).await?;
//! # Ok(())
//! # }
//! ```

pub mod cosmosdb;
pub mod factory;
pub mod gcs;
pub mod memory;
pub mod postgresql;
pub mod pubsub;
pub mod traits;

pub use factory::Backends;
pub use traits::{BlobMeta, BlobStore, Document, JsonRow, Publisher, RecordStore, TableStore};
