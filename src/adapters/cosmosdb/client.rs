//! Cosmos DB client implementation

use crate::adapters::traits::{Document, RecordStore};
use crate::config::CosmosDbConfig;
use crate::domain::{Result, SluiceError};
use async_trait::async_trait;
use azure_core::credentials::Secret;
use azure_data_cosmos::clients::{ContainerClient, DatabaseClient};
use azure_data_cosmos::models::{ContainerProperties, IndexingPolicy, PartitionKeyDefinition};
use azure_data_cosmos::{CosmosClient, CosmosClientOptions, PartitionKey};
use serde_json::Value;
use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

/// Field holding the document id
const ID_FIELD: &str = "id";

/// Cosmos DB document id for a record key
///
/// `/`, `\`, `?` and `#` are not allowed in ids and are percent-encoded along
/// with `%` itself, so distinct keys never collide.
pub fn document_id(key: &str) -> String {
    let mut id = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' => id.push_str("%25"),
            '/' => id.push_str("%2F"),
            '\\' => id.push_str("%5C"),
            '?' => id.push_str("%3F"),
            '#' => id.push_str("%23"),
            other => id.push(other),
        }
    }
    id
}

fn is_not_found(e: &azure_core::Error) -> bool {
    let text = e.to_string();
    text.contains("404") || text.contains("NotFound")
}

/// Strips the id and the service's `_`-prefixed system properties
fn strip_system_fields(mut document: Document) -> Document {
    document.retain(|k, _| k != ID_FIELD && !k.starts_with('_'));
    document
}

/// Record store backed by Cosmos DB
pub struct CosmosRecordStore {
    client: CosmosClient,
    database: DatabaseClient,
    config: CosmosDbConfig,
}

impl CosmosRecordStore {
    /// Creates a client with key authentication
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the client cannot be constructed.
    pub fn new(config: CosmosDbConfig) -> Result<Self> {
        use secrecy::ExposeSecret;

        let key = Secret::new(config.key.expose_secret().as_str().to_string());
        let options = Some(CosmosClientOptions::default());

        let client = CosmosClient::with_key(&config.endpoint, key, options).map_err(|e| {
            SluiceError::StoreUnavailable(format!("Failed to create Cosmos client: {e}"))
        })?;

        let database = client.database_client(&config.database_name);

        Ok(Self {
            client,
            database,
            config,
        })
    }

    /// Reads the database to verify connectivity
    pub async fn test_connection(&self) -> Result<()> {
        self.with_timeout("read database", self.database.read(None))
            .await?
            .map_err(|e| SluiceError::StoreUnavailable(format!("Connection test failed: {e}")))?;
        Ok(())
    }

    /// Creates the database if it does not exist
    pub async fn ensure_database_exists(&self) -> Result<()> {
        match self.database.read(None).await {
            Ok(_) => {
                tracing::debug!(database = %self.config.database_name, "Database already exists");
                Ok(())
            }
            Err(_) => {
                tracing::info!(database = %self.config.database_name, "Creating database");
                self.client
                    .create_database(&self.config.database_name, None)
                    .await
                    .map_err(|e| {
                        SluiceError::StoreUnavailable(format!("Failed to create database: {e}"))
                    })?;
                Ok(())
            }
        }
    }

    /// Creates the container backing `collection` if it does not exist
    pub async fn ensure_collection_exists(&self, collection: &str) -> Result<()> {
        let container = self.container(collection);

        if container.read(None).await.is_ok() {
            tracing::debug!(container = %collection, "Container already exists");
            return Ok(());
        }

        tracing::info!(container = %collection, "Creating container");

        let properties = ContainerProperties {
            id: Cow::Owned(collection.to_string()),
            partition_key: PartitionKeyDefinition {
                paths: vec![format!("/{ID_FIELD}")],
                kind: azure_data_cosmos::models::PartitionKeyKind::Hash,
                version: None,
            },
            indexing_policy: Some(IndexingPolicy::default()),
            ..Default::default()
        };

        self.database
            .create_container(properties, None)
            .await
            .map_err(|e| {
                SluiceError::StoreUnavailable(format!(
                    "Failed to create container {collection}: {e}"
                ))
            })?;

        Ok(())
    }

    /// Database name
    pub fn database_name(&self) -> &str {
        &self.config.database_name
    }

    fn container(&self, collection: &str) -> ContainerClient {
        self.database.container_client(collection)
    }

    async fn with_timeout<T>(&self, operation: &str, fut: impl Future<Output = T>) -> Result<T> {
        let limit = Duration::from_secs(self.config.request_timeout_seconds);
        tokio::time::timeout(limit, fut).await.map_err(|_| {
            SluiceError::StoreUnavailable(format!(
                "Cosmos DB {operation} timed out after {}s",
                limit.as_secs()
            ))
        })
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let container = self.container(collection);
        let partition_key = PartitionKey::from(id.to_string());

        let response = self
            .with_timeout("read", container.read_item::<Document>(partition_key, id, None))
            .await?;

        match response {
            Ok(response) => {
                let document = response.into_body().map_err(|e| {
                    SluiceError::Serialization(format!("Failed to deserialize {collection}/{id}: {e}"))
                })?;
                Ok(Some(document))
            }
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(SluiceError::StoreUnavailable(format!(
                "Failed to read {collection}/{id}: {e}"
            ))),
        }
    }

    async fn upsert(&self, collection: &str, id: &str, mut document: Document) -> Result<()> {
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let container = self.container(collection);
        let partition_key = PartitionKey::from(id.to_string());

        self.with_timeout("upsert", container.upsert_item(partition_key, document, None))
            .await?
            .map_err(|e| {
                SluiceError::StoreUnavailable(format!("Failed to write {collection}/{id}: {e}"))
            })?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for CosmosRecordStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        let id = document_id(key);
        tracing::debug!(collection, id = %id, "Reading record");
        Ok(self.read(collection, &id).await?.map(strip_system_fields))
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> Result<()> {
        let id = document_id(key);
        tracing::debug!(collection, id = %id, "Writing record");
        self.upsert(collection, &id, document).await
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        let id = document_id(key);
        tracing::debug!(collection, id = %id, "Merging record fields");

        let mut document = self
            .read(collection, &id)
            .await?
            .map(strip_system_fields)
            .unwrap_or_default();
        document.extend(fields);

        self.upsert(collection, &id, document).await
    }
}
