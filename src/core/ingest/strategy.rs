//! Load strategies
//!
//! A strategy turns one source file into table data. Which one runs is a
//! deployment decision (`ingest.load_strategy`). Every failure is reported as an
//! [`IngestError`] so the orchestrator can record it uniformly.

use crate::adapters::traits::{
    BlobStore, Document, ExternalCsvSource, JsonRow, LoadJobConfig, TableStore,
};
use crate::domain::ids::{BlobUri, FileId};
use crate::domain::table::TableTarget;
use crate::domain::{IngestError, TableError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Everything a strategy needs to load one file
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// File identifier, also the streaming row id
    pub file_id: FileId,

    /// `gs://{bucket}/{file_id}`
    pub source_uri: BlobUri,

    /// Dataset receiving the table
    pub dataset: String,

    /// Table name prefix
    pub table_prefix: String,

    /// Invocation time, used for the table suffix
    pub requested_at: DateTime<Utc>,
}

impl LoadRequest {
    /// Freshly named `{prefix}_{YYYYMMDDHHMMSS}` table for this request
    pub fn timestamped_target(&self) -> TableTarget {
        TableTarget::timestamped(&self.dataset, &self.table_prefix, self.requested_at)
    }
}

/// What a successful load produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Table that received the data
    pub target: TableTarget,

    /// Rows written, when the store reports it
    pub rows: Option<u64>,
}

/// Available strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategyKind {
    /// Table over the file in place
    #[default]
    ExternalTable,
    /// Load job into a managed table
    BulkLoad,
    /// Single JSON row streamed into the base table
    StreamingInsert,
}

impl fmt::Display for LoadStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStrategyKind::ExternalTable => "external_table",
            LoadStrategyKind::BulkLoad => "bulk_load",
            LoadStrategyKind::StreamingInsert => "streaming_insert",
        };
        f.write_str(name)
    }
}

/// Loads one file into the analytical store
#[async_trait]
pub trait LoadStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Performs the load
    async fn load(&self, request: &LoadRequest) -> Result<LoadReport, IngestError>;
}

/// Creates an external table over the CSV file
pub struct ExternalTableStrategy {
    tables: Arc<dyn TableStore + Send + Sync>,
}

impl ExternalTableStrategy {
    pub fn new(tables: Arc<dyn TableStore + Send + Sync>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl LoadStrategy for ExternalTableStrategy {
    fn name(&self) -> &'static str {
        "external_table"
    }

    async fn load(&self, request: &LoadRequest) -> Result<LoadReport, IngestError> {
        let target = request.timestamped_target();
        let source = ExternalCsvSource::with_fixed_schema(request.source_uri.clone());

        tracing::info!(table = %target, source = %request.source_uri, "Creating external table");
        self.tables
            .create_external_table(&target, &source)
            .await
            .map_err(|e| {
                IngestError::with_source(
                    format!("Failed to create external table {target} over {}", request.source_uri),
                    e,
                )
            })?;

        Ok(LoadReport { target, rows: None })
    }
}

/// Runs a load job into a new managed table
pub struct BulkLoadStrategy {
    tables: Arc<dyn TableStore + Send + Sync>,
}

impl BulkLoadStrategy {
    pub fn new(tables: Arc<dyn TableStore + Send + Sync>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl LoadStrategy for BulkLoadStrategy {
    fn name(&self) -> &'static str {
        "bulk_load"
    }

    async fn load(&self, request: &LoadRequest) -> Result<LoadReport, IngestError> {
        let target = request.timestamped_target();
        let job = LoadJobConfig::with_fixed_schema(request.source_uri.clone());

        tracing::info!(table = %target, source = %request.source_uri, "Starting load job");
        let rows = self
            .tables
            .load_table_from_uri(&target, &job)
            .await
            .map_err(|e| {
                IngestError::with_source(
                    format!("Failed to load {} into {target}", request.source_uri),
                    e,
                )
            })?;

        Ok(LoadReport {
            target,
            rows: Some(rows),
        })
    }
}

/// Streams the file, parsed as one JSON row, into the base table
///
/// The file id is the row id, so the store can drop a replayed row. The insert
/// is tried at most twice, and both tries share one deadline.
pub struct StreamingInsertStrategy {
    blobs: Arc<dyn BlobStore + Send + Sync>,
    tables: Arc<dyn TableStore + Send + Sync>,
    deadline: Duration,
}

impl StreamingInsertStrategy {
    pub fn new(
        blobs: Arc<dyn BlobStore + Send + Sync>,
        tables: Arc<dyn TableStore + Send + Sync>,
        deadline: Duration,
    ) -> Self {
        Self {
            blobs,
            tables,
            deadline,
        }
    }

    async fn read_row(&self, request: &LoadRequest) -> Result<JsonRow, IngestError> {
        let bytes = self.blobs.get(&request.source_uri).await.map_err(|e| {
            IngestError::with_source(format!("Failed to read {}", request.source_uri), e)
        })?;

        let data: Document = serde_json::from_slice(&bytes).map_err(|e| {
            IngestError::with_source(
                format!("{} is not a JSON object", request.source_uri),
                e,
            )
        })?;

        Ok(JsonRow {
            row_id: request.file_id.as_str().to_string(),
            data,
        })
    }

    async fn insert_with_retry(
        &self,
        target: &TableTarget,
        rows: &[JsonRow],
    ) -> crate::domain::Result<Vec<crate::domain::RowInsertError>> {
        match self.tables.insert_rows_json(target, rows).await {
            Ok(errors) => Ok(errors),
            Err(e) => {
                tracing::warn!(table = %target, error = %e, "Streaming insert failed, retrying once");
                self.tables.insert_rows_json(target, rows).await
            }
        }
    }
}

#[async_trait]
impl LoadStrategy for StreamingInsertStrategy {
    fn name(&self) -> &'static str {
        "streaming_insert"
    }

    async fn load(&self, request: &LoadRequest) -> Result<LoadReport, IngestError> {
        let target = TableTarget::base(&request.dataset, &request.table_prefix);
        let rows = [self.read_row(request).await?];

        tracing::info!(table = %target, row_id = %request.file_id, "Streaming row");
        let outcome = tokio::time::timeout(self.deadline, self.insert_with_retry(&target, &rows))
            .await
            .map_err(|_| {
                IngestError::with_source(
                    format!("Streaming insert into {target} did not finish"),
                    TableError::Timeout(format!("{}s", self.deadline.as_secs())),
                )
            })?;

        let errors = outcome.map_err(|e| {
            IngestError::with_source(format!("Streaming insert into {target} failed"), e)
        })?;
        if !errors.is_empty() {
            return Err(IngestError::new(TableError::RowErrors(errors).to_string()));
        }

        Ok(LoadReport {
            target,
            rows: Some(1),
        })
    }
}

/// Builds the configured strategy
pub fn create_strategy(
    kind: LoadStrategyKind,
    blobs: Arc<dyn BlobStore + Send + Sync>,
    tables: Arc<dyn TableStore + Send + Sync>,
    streaming_deadline: Duration,
) -> Arc<dyn LoadStrategy> {
    match kind {
        LoadStrategyKind::ExternalTable => Arc::new(ExternalTableStrategy::new(tables)),
        LoadStrategyKind::BulkLoad => Arc::new(BulkLoadStrategy::new(tables)),
        LoadStrategyKind::StreamingInsert => Arc::new(StreamingInsertStrategy::new(
            blobs,
            tables,
            streaming_deadline,
        )),
    }
}
