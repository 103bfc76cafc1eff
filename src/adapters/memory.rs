//! In-memory backends
//!
//! Thread-safe implementations of every adapter trait, for tests and local dry
//! runs. Each one records the calls it receives and can be told to fail.

use crate::adapters::traits::{
    BlobMeta, BlobStore, Document, ExternalCsvSource, JsonRow, LoadJobConfig, Publisher,
    RecordStore, TableStore,
};
use crate::domain::ids::BlobUri;
use crate::domain::table::{TableTarget, FIXED_SCHEMA};
use crate::domain::{BlobError, Result, RowInsertError, SluiceError, TableError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    documents: Mutex<HashMap<String, Document>>,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document directly, bypassing call recording
    pub fn insert(&self, collection: &str, key: &str, document: Document) {
        lock(&self.documents).insert(path(collection, key), document);
    }

    /// Current content of a document
    pub fn document(&self, collection: &str, key: &str) -> Option<Document> {
        lock(&self.documents).get(&path(collection, key)).cloned()
    }

    /// Calls received so far, as `"{op} {collection}/{key}"`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of `set` and `update` calls received
    pub fn write_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.starts_with("set ") || c.starts_with("update "))
            .count()
    }

    /// Makes every subsequent call fail as if the store were unreachable
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    /// Clears an injected failure
    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    fn enter(&self, op: &str, collection: &str, key: &str) -> Result<()> {
        lock(&self.calls).push(format!("{op} {}", path(collection, key)));
        match lock(&self.failure).as_ref() {
            Some(message) => Err(SluiceError::StoreUnavailable(message.clone())),
            None => Ok(()),
        }
    }
}

fn path(collection: &str, key: &str) -> String {
    format!("{collection}/{key}")
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>> {
        self.enter("get", collection, key)?;
        Ok(self.document(collection, key))
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> Result<()> {
        self.enter("set", collection, key)?;
        lock(&self.documents).insert(path(collection, key), document);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<()> {
        self.enter("update", collection, key)?;
        lock(&self.documents)
            .entry(path(collection, key))
            .or_default()
            .extend(fields);
        Ok(())
    }
}

/// Blob operation, for targeted failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobOperation {
    Get,
    Head,
    Copy,
    Delete,
}

/// In-memory object store keyed by `gs://` URI
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobUri, Bytes>>,
    calls: Mutex<Vec<(BlobOperation, String)>>,
    failures: Mutex<HashMap<BlobOperation, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a blob
    pub fn put(&self, uri: BlobUri, data: impl Into<Bytes>) {
        lock(&self.blobs).insert(uri, data.into());
    }

    /// Whether a blob exists
    pub fn contains(&self, uri: &BlobUri) -> bool {
        lock(&self.blobs).contains_key(uri)
    }

    /// Calls received for one operation, as URIs
    pub fn calls(&self, operation: BlobOperation) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, target)| target.clone())
            .collect()
    }

    /// Makes every subsequent call of `operation` fail with a server error
    pub fn fail_on(&self, operation: BlobOperation, message: impl Into<String>) {
        lock(&self.failures).insert(operation, message.into());
    }

    fn enter(&self, operation: BlobOperation, target: String) -> Result<()> {
        lock(&self.calls).push((operation, target));
        match lock(&self.failures).get(&operation) {
            Some(message) => Err(BlobError::ServerError {
                status: 503,
                message: message.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, uri: &BlobUri) -> Result<Bytes> {
        self.enter(BlobOperation::Get, uri.to_string())?;
        lock(&self.blobs)
            .get(uri)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(uri.to_string()).into())
    }

    async fn head(&self, uri: &BlobUri) -> Result<Option<BlobMeta>> {
        self.enter(BlobOperation::Head, uri.to_string())?;
        Ok(lock(&self.blobs).get(uri).map(|data| BlobMeta {
            uri: uri.clone(),
            size: data.len() as u64,
            content_type: None,
            updated: Some(Utc::now()),
        }))
    }

    async fn copy(&self, source: &BlobUri, destination: &BlobUri) -> Result<()> {
        self.enter(BlobOperation::Copy, format!("{source} -> {destination}"))?;
        let mut blobs = lock(&self.blobs);
        let data = blobs
            .get(source)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(source.to_string()))?;
        blobs.insert(destination.clone(), data);
        Ok(())
    }

    async fn delete(&self, uri: &BlobUri) -> Result<()> {
        self.enter(BlobOperation::Delete, uri.to_string())?;
        lock(&self.blobs)
            .remove(uri)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(uri.to_string()).into())
    }
}

/// Table created in a [`MemoryTableStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryTable {
    /// External table over a file
    External { source: BlobUri },

    /// Managed table filled by a load job
    Loaded { source: BlobUri, rows: u64 },

    /// Table receiving streamed rows
    Streaming { rows: Vec<JsonRow> },
}

/// In-memory analytical store
///
/// When built with [`MemoryTableStore::with_blobs`], load jobs read the source
/// CSV and reject rows whose column count does not match the schema.
#[derive(Default)]
pub struct MemoryTableStore {
    blobs: Option<Arc<dyn BlobStore + Send + Sync>>,
    tables: Mutex<HashMap<TableTarget, MemoryTable>>,
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<String>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blobs(blobs: Arc<dyn BlobStore + Send + Sync>) -> Self {
        Self {
            blobs: Some(blobs),
            ..Self::default()
        }
    }

    /// Table state, if created
    pub fn table(&self, target: &TableTarget) -> Option<MemoryTable> {
        lock(&self.tables).get(target).cloned()
    }

    /// Number of tables created
    pub fn table_count(&self) -> usize {
        lock(&self.tables).len()
    }

    /// Calls received so far, as `"{op} {dataset}.{table}"`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Makes every subsequent call fail with a query error
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    fn enter(&self, op: &str, target: &TableTarget) -> Result<()> {
        lock(&self.calls).push(format!("{op} {target}"));
        match lock(&self.failure).as_ref() {
            Some(message) => Err(TableError::QueryFailed(message.clone()).into()),
            None => Ok(()),
        }
    }

    fn ensure_absent(&self, target: &TableTarget) -> Result<()> {
        if lock(&self.tables).contains_key(target) {
            return Err(TableError::AlreadyExists(target.to_string()).into());
        }
        Ok(())
    }

    async fn count_csv_rows(&self, job: &LoadJobConfig) -> Result<u64> {
        let Some(blobs) = &self.blobs else {
            return Ok(0);
        };
        let data = blobs.get(&job.source_uri).await?;
        let text = std::str::from_utf8(&data)
            .map_err(|e| TableError::InvalidSource(format!("{}: {e}", job.source_uri)))?;

        let mut rows = 0;
        for (index, line) in text
            .lines()
            .enumerate()
            .skip(job.skip_leading_rows as usize)
        {
            if line.trim().is_empty() {
                continue;
            }
            let columns = line.split(',').count();
            if columns != job.schema.len() {
                return Err(TableError::InvalidSource(format!(
                    "{} line {}: expected {} columns, found {columns}",
                    job.source_uri,
                    index + 1,
                    job.schema.len()
                ))
                .into());
            }
            rows += 1;
        }
        Ok(rows)
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn create_external_table(
        &self,
        target: &TableTarget,
        source: &ExternalCsvSource,
    ) -> Result<()> {
        self.enter("create_external_table", target)?;
        self.ensure_absent(target)?;
        lock(&self.tables).insert(
            target.clone(),
            MemoryTable::External {
                source: source.source_uri.clone(),
            },
        );
        Ok(())
    }

    async fn load_table_from_uri(&self, target: &TableTarget, job: &LoadJobConfig) -> Result<u64> {
        self.enter("load_table_from_uri", target)?;
        self.ensure_absent(target)?;
        let rows = self.count_csv_rows(job).await?;
        lock(&self.tables).insert(
            target.clone(),
            MemoryTable::Loaded {
                source: job.source_uri.clone(),
                rows,
            },
        );
        Ok(rows)
    }

    async fn insert_rows_json(
        &self,
        target: &TableTarget,
        rows: &[JsonRow],
    ) -> Result<Vec<RowInsertError>> {
        self.enter("insert_rows_json", target)?;

        let mut tables = lock(&self.tables);
        let table = tables
            .entry(target.clone())
            .or_insert_with(|| MemoryTable::Streaming { rows: Vec::new() });
        let MemoryTable::Streaming { rows: stored } = table else {
            return Err(TableError::QueryFailed(format!(
                "{target} does not accept streaming inserts"
            ))
            .into());
        };

        let mut errors = Vec::new();
        for row in rows {
            if let Some(reason) = row.schema_violation(&FIXED_SCHEMA) {
                errors.push(RowInsertError {
                    row_id: row.row_id.clone(),
                    reason,
                });
                continue;
            }
            if stored.iter().any(|existing| existing.row_id == row.row_id) {
                continue;
            }
            stored.push(row.clone());
        }
        Ok(errors)
    }
}

/// A message accepted by a [`MemoryPublisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub data: String,
    pub attributes: HashMap<String, String>,
}

/// In-memory notification bus
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    failure: Mutex<Option<String>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far
    pub fn messages(&self) -> Vec<PublishedMessage> {
        lock(&self.messages).clone()
    }

    /// Messages accepted on one topic
    pub fn messages_on(&self, topic: &str) -> Vec<PublishedMessage> {
        lock(&self.messages)
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Makes every subsequent publish fail
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: &HashMap<String, String>,
    ) -> Result<String> {
        if let Some(message) = lock(&self.failure).as_ref() {
            return Err(SluiceError::Publish(message.clone()));
        }
        let mut messages = lock(&self.messages);
        messages.push(PublishedMessage {
            topic: topic.to_string(),
            data: String::from_utf8_lossy(data).into_owned(),
            attributes: attributes.clone(),
        });
        Ok(messages.len().to_string())
    }
}

/// Convenience: an object document from a JSON literal
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn uri(s: &str) -> BlobUri {
        BlobUri::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_record_store_update_merges_fields() {
        let store = MemoryRecordStore::new();
        store
            .set("c", "k", document(json!({"success": true, "when": "x"})))
            .await
            .unwrap();
        store
            .update("c", "k", document(json!({"duplication_attempts": ["y"]})))
            .await
            .unwrap();

        let doc = store.document("c", "k").unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_blob_copy_and_delete() {
        let blobs = MemoryBlobStore::new();
        blobs.put(uri("gs://src/f.csv"), "a,b");

        blobs
            .copy(&uri("gs://src/f.csv"), &uri("gs://dst/f.csv"))
            .await
            .unwrap();
        blobs.delete(&uri("gs://src/f.csv")).await.unwrap();

        assert!(!blobs.contains(&uri("gs://src/f.csv")));
        assert!(blobs.contains(&uri("gs://dst/f.csv")));
        assert_eq!(blobs.calls(BlobOperation::Copy).len(), 1);
    }

    #[tokio::test]
    async fn test_blob_get_missing() {
        let blobs = MemoryBlobStore::new();
        let err = blobs.get(&uri("gs://src/none.csv")).await.unwrap_err();
        assert!(matches!(err, SluiceError::Blob(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_external_table_already_exists() {
        let tables = MemoryTableStore::new();
        let target = TableTarget::base("ds", "dc_1");
        let source = ExternalCsvSource::with_fixed_schema(uri("gs://b/a.csv"));

        tables.create_external_table(&target, &source).await.unwrap();
        let err = tables
            .create_external_table(&target, &source)
            .await
            .unwrap_err();
        assert!(matches!(err, SluiceError::Table(TableError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_load_counts_csv_rows() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let header = FIXED_SCHEMA.map(|f| f.name).join(",");
        let row = vec!["v"; FIXED_SCHEMA.len()].join(",");
        blobs.put(uri("gs://b/a.csv"), format!("{header}\n{row}\n{row}\n"));

        let tables = MemoryTableStore::with_blobs(blobs);
        let target = TableTarget::base("ds", "dc_1");
        let rows = tables
            .load_table_from_uri(&target, &LoadJobConfig::with_fixed_schema(uri("gs://b/a.csv")))
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_insert_rows_reports_unknown_fields() {
        let tables = MemoryTableStore::new();
        let target = TableTarget::base("ds", "dc");
        let rows = vec![JsonRow {
            row_id: "a.json".to_string(),
            data: document(json!({"hash": "00ab", "colour": "red"})),
        }];
        let errors = tables.insert_rows_json(&target, &rows).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].reason, "no such field: colour");
    }

    #[tokio::test]
    async fn test_publisher_records_messages() {
        let publisher = MemoryPublisher::new();
        let attributes = HashMap::from([("file_name".to_string(), "a.csv".to_string())]);
        let id = publisher
            .publish("projects/p/topics/t", b"hello", &attributes)
            .await
            .unwrap();
        assert_eq!(id, "1");
        assert_eq!(publisher.messages_on("projects/p/topics/t")[0].data, "hello");
    }
}
