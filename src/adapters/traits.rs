//! Storage and messaging abstraction traits
//!
//! These traits define the interfaces the pipeline uses to talk to the outside
//! world. Concrete clients are built once per process by the factory functions
//! and injected as `Arc<dyn Trait + Send + Sync>`.

use crate::domain::ids::BlobUri;
use crate::domain::table::{SchemaField, TableTarget, FIXED_SCHEMA};
use crate::domain::{Result, RowInsertError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A stored document: top-level field name to value
pub type Document = Map<String, Value>;

/// Metadata about a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    /// Blob location
    pub uri: BlobUri,

    /// Size in bytes
    pub size: u64,

    /// Content type reported by the store
    pub content_type: Option<String>,

    /// Last modification timestamp
    pub updated: Option<DateTime<Utc>>,
}

/// Federated CSV source for an external table
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCsvSource {
    /// File backing the table
    pub source_uri: BlobUri,

    /// Header rows to ignore
    pub skip_leading_rows: u32,

    /// Column layout
    pub schema: Vec<SchemaField>,
}

impl ExternalCsvSource {
    /// CSV source with one header row and the fixed block schema
    pub fn with_fixed_schema(source_uri: BlobUri) -> Self {
        Self {
            source_uri,
            skip_leading_rows: 1,
            schema: FIXED_SCHEMA.to_vec(),
        }
    }
}

/// Bulk load job reading a CSV file into a managed table
#[derive(Debug, Clone, PartialEq)]
pub struct LoadJobConfig {
    /// File to load
    pub source_uri: BlobUri,

    /// Header rows to ignore
    pub skip_leading_rows: u32,

    /// Column layout of the created table
    pub schema: Vec<SchemaField>,
}

impl LoadJobConfig {
    /// CSV load with one header row and the fixed block schema
    pub fn with_fixed_schema(source_uri: BlobUri) -> Self {
        Self {
            source_uri,
            skip_leading_rows: 1,
            schema: FIXED_SCHEMA.to_vec(),
        }
    }
}

/// One row for a streaming insert
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRow {
    /// Best-effort de-duplication key
    pub row_id: String,

    /// Column values
    pub data: Document,
}

impl JsonRow {
    /// Why this row does not fit `schema`, if it does not
    ///
    /// Every key must name a column and every value must be a string or null.
    pub fn schema_violation(&self, schema: &[SchemaField]) -> Option<String> {
        if let Some(unknown) = self
            .data
            .keys()
            .find(|k| !schema.iter().any(|f| f.name == k.as_str()))
        {
            return Some(format!("no such field: {unknown}"));
        }
        if self.data.values().any(|v| !(v.is_string() || v.is_null())) {
            return Some("all fields must be strings".to_string());
        }
        None
    }
}

/// Object storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the entire blob
    ///
    /// # Errors
    ///
    /// Returns `BlobError::NotFound` if the blob does not exist.
    async fn get(&self, uri: &BlobUri) -> Result<Bytes>;

    /// Reads blob metadata without the content
    ///
    /// Returns `None` if the blob does not exist.
    async fn head(&self, uri: &BlobUri) -> Result<Option<BlobMeta>>;

    /// Copies a blob, overwriting the destination if present
    async fn copy(&self, source: &BlobUri, destination: &BlobUri) -> Result<()>;

    /// Deletes a blob
    async fn delete(&self, uri: &BlobUri) -> Result<()>;
}

/// Analytical table storage
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Creates a table backed by an external CSV file
    ///
    /// # Errors
    ///
    /// Returns `TableError::AlreadyExists` if the target already exists.
    async fn create_external_table(
        &self,
        target: &TableTarget,
        source: &ExternalCsvSource,
    ) -> Result<()>;

    /// Runs a load job into a freshly created managed table, returning the row count
    async fn load_table_from_uri(&self, target: &TableTarget, job: &LoadJobConfig) -> Result<u64>;

    /// Streams rows into an existing table
    ///
    /// Row-level rejections are returned, not raised. An empty vector means every
    /// row was accepted.
    async fn insert_rows_json(
        &self,
        target: &TableTarget,
        rows: &[JsonRow],
    ) -> Result<Vec<RowInsertError>>;
}

/// Keyed document store
///
/// Documents live at `{collection}/{key}`.
///
/// # Errors
///
/// Every method returns `SluiceError::StoreUnavailable` when the store cannot be
/// reached.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads a document, `None` if absent
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>>;

    /// Replaces the whole document
    async fn set(&self, collection: &str, key: &str, document: Document) -> Result<()>;

    /// Merges the given top-level fields into the document, creating it if absent
    ///
    /// Fields not named in `fields` are left untouched.
    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<()>;
}

/// Notification bus
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one message and waits for the bus to accept it
    ///
    /// Returns the message id assigned by the bus.
    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: &HashMap<String, String>,
    ) -> Result<String>;
}
