//! Backend factory
//!
//! Builds the concrete client for each adapter trait from configuration. In
//! dry-run mode the ledger, tables and publisher are in-memory; blobs are
//! still read from the configured object store.

use crate::adapters::cosmosdb::CosmosRecordStore;
use crate::adapters::gcs::GcsBlobStore;
use crate::adapters::memory::{MemoryPublisher, MemoryRecordStore, MemoryTableStore};
use crate::adapters::postgresql::{PostgresClient, PostgresTableStore};
use crate::adapters::pubsub::PubSubPublisher;
use crate::adapters::traits::{BlobStore, Publisher, RecordStore, TableStore};
use crate::config::SluiceConfig;
use crate::domain::{Result, SluiceError};
use std::sync::Arc;

/// Every backend one process needs
#[derive(Clone)]
pub struct Backends {
    pub blobs: Arc<dyn BlobStore + Send + Sync>,
    pub tables: Arc<dyn TableStore + Send + Sync>,
    pub records: Arc<dyn RecordStore + Send + Sync>,
    pub publisher: Arc<dyn Publisher + Send + Sync>,
}

/// Object store client
pub fn create_blob_store(config: &SluiceConfig) -> Result<Arc<dyn BlobStore + Send + Sync>> {
    tracing::info!(endpoint = %config.gcs.endpoint, "Creating Cloud Storage client");
    Ok(Arc::new(GcsBlobStore::new(&config.gcs)?))
}

/// Analytical table store
///
/// `blobs` feeds bulk loads with file contents.
pub fn create_table_store(
    config: &SluiceConfig,
    blobs: Arc<dyn BlobStore + Send + Sync>,
) -> Result<Arc<dyn TableStore + Send + Sync>> {
    if config.application.dry_run {
        tracing::info!("DRY RUN: Using in-memory table store");
        return Ok(Arc::new(MemoryTableStore::with_blobs(blobs)));
    }

    let pg_config = config.postgresql.as_ref().ok_or_else(|| {
        SluiceError::Configuration("[postgresql] section is required".to_string())
    })?;

    tracing::info!("Creating PostgreSQL client");
    let client = PostgresClient::new(pg_config.clone())?;
    Ok(Arc::new(PostgresTableStore::new(Arc::new(client), blobs)))
}

/// Document store backing the status ledger
///
/// The database and the ledger container are created if missing.
pub async fn create_record_store(
    config: &SluiceConfig,
) -> Result<Arc<dyn RecordStore + Send + Sync>> {
    if config.application.dry_run {
        tracing::info!("DRY RUN: Using in-memory status ledger");
        return Ok(Arc::new(MemoryRecordStore::new()));
    }

    let cosmos_config = config.cosmosdb.as_ref().ok_or_else(|| {
        SluiceError::Configuration("[cosmosdb] section is required".to_string())
    })?;

    tracing::info!(database = %cosmos_config.database_name, "Creating Cosmos DB client");
    let store = CosmosRecordStore::new(cosmos_config.clone())?;
    store.ensure_database_exists().await?;
    store
        .ensure_collection_exists(&config.ingest.ledger_collection)
        .await?;

    Ok(Arc::new(store))
}

/// Notification publisher
pub fn create_publisher(config: &SluiceConfig) -> Result<Arc<dyn Publisher + Send + Sync>> {
    if config.application.dry_run {
        tracing::info!("DRY RUN: Using in-memory publisher");
        return Ok(Arc::new(MemoryPublisher::new()));
    }

    tracing::info!(endpoint = %config.pubsub.endpoint, "Creating Pub/Sub client");
    Ok(Arc::new(PubSubPublisher::new(&config.pubsub)?))
}

/// Builds all four backends
pub async fn create_backends(config: &SluiceConfig) -> Result<Backends> {
    let blobs = create_blob_store(config)?;
    let tables = create_table_store(config, blobs.clone())?;
    let records = create_record_store(config).await?;
    let publisher = create_publisher(config)?;

    Ok(Backends {
        blobs,
        tables,
        records,
        publisher,
    })
}
