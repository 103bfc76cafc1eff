//! Status ledger
//!
//! Per-file ingestion outcomes kept in the document store. The ledger is what
//! makes redelivered file-created events harmless: a file whose record says
//! `success = true` is never loaded again.
//!
//! Reads and writes are separate store calls. Two concurrent triggers for the
//! same file can both observe "not ingested" and both load.

use crate::adapters::traits::{Document, RecordStore};
use crate::domain::ids::FileId;
use crate::domain::record::{fields, ledger_time, IngestionRecord};
use crate::domain::{Result, SluiceError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Default collection holding ingestion records
pub const DEFAULT_COLLECTION: &str = "streaming_files";

/// Status ledger over a document store
pub struct StatusLedger {
    /// Document store backend
    store: Arc<dyn RecordStore + Send + Sync>,

    /// Collection holding one document per file
    collection: String,
}

impl StatusLedger {
    /// Create a new ledger writing to `collection`
    pub fn new(store: Arc<dyn RecordStore + Send + Sync>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Load the record for a file
    ///
    /// A stored timestamp that does not parse is logged and dropped, so the
    /// outcome fields stay usable.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be reached, or
    /// `Serialization` if the stored outcome fields are not a valid record.
    pub async fn get(&self, file_id: &FileId) -> Result<Option<IngestionRecord>> {
        let Some(mut document) = self.store.get(&self.collection, file_id.as_str()).await? else {
            return Ok(None);
        };

        let dropped = drop_unreadable_timestamps(&mut document);
        if !dropped.is_empty() {
            tracing::warn!(
                file_id = %file_id,
                collection = %self.collection,
                dropped = ?dropped,
                "Ignoring unreadable timestamps in ledger record"
            );
        }

        serde_json::from_value(Value::Object(document))
            .map(Some)
            .map_err(|e| {
                SluiceError::Serialization(format!(
                    "Invalid ledger record {}/{}: {e}",
                    self.collection, file_id
                ))
            })
    }

    /// Whether the file has a record with `success = true`
    ///
    /// Failed records and records without an outcome are eligible for another
    /// attempt.
    pub async fn is_already_ingested(&self, file_id: &FileId) -> Result<bool> {
        Ok(self
            .get(file_id)
            .await?
            .is_some_and(|record| record.is_ingested()))
    }

    /// Overwrite the record with a successful outcome
    ///
    /// Any previous error message and duplicate-attempt history is dropped.
    pub async fn record_success(&self, file_id: &FileId, when: DateTime<Utc>) -> Result<()> {
        tracing::debug!(file_id = %file_id, collection = %self.collection, "Recording success");
        self.write(file_id, &IngestionRecord::succeeded(when)).await
    }

    /// Overwrite the record with a failed outcome
    pub async fn record_failure(
        &self,
        file_id: &FileId,
        message: &str,
        when: DateTime<Utc>,
    ) -> Result<()> {
        tracing::debug!(file_id = %file_id, collection = %self.collection, "Recording failure");
        self.write(file_id, &IngestionRecord::failed(message, when))
            .await
    }

    /// Prepend a re-trigger timestamp to `duplication_attempts`
    ///
    /// Only that field is written. The outcome fields stay as they are.
    pub async fn record_duplicate_attempt(
        &self,
        file_id: &FileId,
        when: DateTime<Utc>,
    ) -> Result<()> {
        let mut attempts = self
            .get(file_id)
            .await?
            .map(|record| record.duplication_attempts)
            .unwrap_or_default();
        attempts.insert(0, when);

        let values = attempts
            .iter()
            .map(|ts| Value::String(ledger_time::format(ts)))
            .collect();

        let mut update = Document::new();
        update.insert(fields::DUPLICATION_ATTEMPTS.to_string(), Value::Array(values));

        tracing::debug!(
            file_id = %file_id,
            attempts = attempts.len(),
            "Recording duplicate attempt"
        );
        self.store
            .update(&self.collection, file_id.as_str(), update)
            .await
    }

    async fn write(&self, file_id: &FileId, record: &IngestionRecord) -> Result<()> {
        let Value::Object(document) = serde_json::to_value(record)? else {
            return Err(SluiceError::Serialization(
                "Ingestion record did not serialize to an object".to_string(),
            ));
        };
        self.store
            .set(&self.collection, file_id.as_str(), document)
            .await
    }
}

/// Removes `when` and `duplication_attempts` entries that are not ledger
/// timestamps, returning the raw values that were dropped
fn drop_unreadable_timestamps(document: &mut Document) -> Vec<String> {
    let readable = |value: &Value| value.as_str().is_some_and(|s| ledger_time::parse(s).is_ok());
    let mut dropped = Vec::new();

    if let Some(when) = document.get(fields::WHEN) {
        if !when.is_null() && !readable(when) {
            dropped.push(when.to_string());
            document.remove(fields::WHEN);
        }
    }

    match document.get_mut(fields::DUPLICATION_ATTEMPTS) {
        Some(Value::Array(attempts)) => attempts.retain(|ts| {
            let keep = readable(ts);
            if !keep {
                dropped.push(ts.to_string());
            }
            keep
        }),
        Some(Value::Null) | None => {}
        Some(other) => {
            dropped.push(other.to_string());
            document.remove(fields::DUPLICATION_ATTEMPTS);
        }
    }

    dropped
}
