//! `TableStore` over PostgreSQL

use crate::adapters::postgresql::client::PostgresClient;
use crate::adapters::postgresql::sql;
use crate::adapters::traits::{BlobStore, ExternalCsvSource, JsonRow, LoadJobConfig, TableStore};
use crate::domain::table::{TableTarget, FIXED_SCHEMA};
use crate::domain::{Result, RowInsertError, TableError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::SinkExt;
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::error::SqlState;

/// Maps a driver error onto the table error taxonomy
fn table_error(target: &TableTarget, context: &str, e: tokio_postgres::Error) -> TableError {
    match e.code() {
        Some(code) if *code == SqlState::DUPLICATE_TABLE => {
            TableError::AlreadyExists(target.to_string())
        }
        Some(code) if *code == SqlState::QUERY_CANCELED => {
            TableError::Timeout(format!("{context} {target}: {e}"))
        }
        // Class 22: data exceptions raised while parsing the file
        Some(code) if code.code().starts_with("22") => {
            TableError::InvalidSource(format!("{context} {target}: {e}"))
        }
        _ => TableError::QueryFailed(format!("{context} {target}: {e}")),
    }
}

/// Analytical tables in PostgreSQL
pub struct PostgresTableStore {
    client: Arc<PostgresClient>,
    blobs: Arc<dyn BlobStore + Send + Sync>,
}

impl PostgresTableStore {
    /// `blobs` supplies file contents for bulk loads
    pub fn new(client: Arc<PostgresClient>, blobs: Arc<dyn BlobStore + Send + Sync>) -> Self {
        Self { client, blobs }
    }

    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }
}

#[async_trait]
impl TableStore for PostgresTableStore {
    async fn create_external_table(
        &self,
        target: &TableTarget,
        source: &ExternalCsvSource,
    ) -> Result<()> {
        let header = match source.skip_leading_rows {
            0 => false,
            1 => true,
            n => {
                return Err(TableError::InvalidSource(format!(
                    "file_fdw can skip at most one header row, {n} requested"
                ))
                .into())
            }
        };

        let config = self.client.config();
        let path = sql::external_path(&config.external_root, &source.source_uri);
        let client = self.client.connection().await?;

        client
            .batch_execute(&format!(
                "{}; {}",
                sql::create_schema(&target.dataset),
                sql::ensure_foreign_server(&config.foreign_server)
            ))
            .await
            .map_err(|e| table_error(target, "Failed to prepare", e))?;

        client
            .batch_execute(&sql::create_foreign_table(
                target,
                &source.schema,
                &config.foreign_server,
                &path,
                header,
            ))
            .await
            .map_err(|e| table_error(target, "Failed to create external table", e))?;

        tracing::debug!(table = %target, path = %path, "Foreign table created");
        Ok(())
    }

    async fn load_table_from_uri(&self, target: &TableTarget, job: &LoadJobConfig) -> Result<u64> {
        let data = self.blobs.get(&job.source_uri).await?;
        let body = Bytes::copy_from_slice(sql::skip_leading_rows(&data, job.skip_leading_rows));

        let mut client = self.client.connection().await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| table_error(target, "Failed to begin load of", e))?;

        tx.batch_execute(&format!(
            "{}; {}",
            sql::create_schema(&target.dataset),
            sql::create_table(target, &job.schema)
        ))
        .await
        .map_err(|e| table_error(target, "Failed to create", e))?;

        let copy = sql::copy_csv(target, &job.schema);
        let sink = tx
            .copy_in::<str, Bytes>(copy.as_str())
            .await
            .map_err(|e| table_error(target, "Failed to start load of", e))?;
        futures::pin_mut!(sink);
        sink.send(body)
            .await
            .map_err(|e| table_error(target, "Failed to load", e))?;
        let rows = sink
            .as_mut()
            .finish()
            .await
            .map_err(|e| table_error(target, "Failed to load", e))?;

        tx.commit()
            .await
            .map_err(|e| table_error(target, "Failed to commit load of", e))?;

        tracing::debug!(table = %target, rows, "Load committed");
        Ok(rows)
    }

    async fn insert_rows_json(
        &self,
        target: &TableTarget,
        rows: &[JsonRow],
    ) -> Result<Vec<RowInsertError>> {
        let client = self.client.connection().await?;

        client
            .batch_execute(&format!(
                "{}; {}",
                sql::create_schema(&target.dataset),
                sql::create_streaming_table(target, &FIXED_SCHEMA)
            ))
            .await
            .map_err(|e| table_error(target, "Failed to prepare", e))?;

        let statement = client
            .prepare(&sql::insert_json_row(target, &FIXED_SCHEMA))
            .await
            .map_err(|e| table_error(target, "Failed to prepare insert into", e))?;

        let mut errors = Vec::new();
        for row in rows {
            if let Some(reason) = row.schema_violation(&FIXED_SCHEMA) {
                errors.push(RowInsertError {
                    row_id: row.row_id.clone(),
                    reason,
                });
                continue;
            }

            let data = Value::Object(row.data.clone());
            match client.execute(&statement, &[&row.row_id, &data]).await {
                Ok(0) => tracing::debug!(table = %target, row_id = %row.row_id, "Row already present"),
                Ok(_) => {}
                Err(e) if e.code().is_some() => errors.push(RowInsertError {
                    row_id: row.row_id.clone(),
                    reason: e.to_string(),
                }),
                Err(e) => return Err(table_error(target, "Failed to insert into", e).into()),
            }
        }

        Ok(errors)
    }
}

