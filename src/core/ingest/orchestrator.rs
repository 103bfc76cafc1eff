//! Ingestion orchestrator
//!
//! The per-file state machine:
//!
//! ```text
//! RECEIVED -> DUPLICATE
//!          -> LOADING -> RECORDED_SUCCESS
//!                     -> RECORDED_FAILURE
//! ```
//!
//! A load failure is recorded and published, never returned as an error. Ledger
//! and publish errors are returned to the trigger.

use crate::core::clock::Clock;
use crate::core::ingest::strategy::{LoadReport, LoadRequest, LoadStrategy};
use crate::core::ledger::StatusLedger;
use crate::core::notify::{failure_message, Notifier};
use crate::domain::ids::{BlobUri, BucketName, FileId};
use crate::domain::Result;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// How one trigger was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// File was already ingested; the attempt was recorded and nothing loaded
    Duplicate,

    /// File was loaded and the success published
    Loaded(LoadReport),

    /// Load failed; the failure was recorded and published
    Failed {
        /// Message stored in the ledger and published
        message: String,
    },
}

/// Names the orchestrator needs to build load requests
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Dataset receiving new tables
    pub dataset: String,

    /// Table name prefix
    pub table_prefix: String,
}

/// Runs one ingestion per trigger
pub struct IngestionOrchestrator {
    ledger: StatusLedger,
    strategy: Arc<dyn LoadStrategy>,
    notifier: Notifier,
    settings: IngestSettings,
    clock: Arc<dyn Clock>,
}

impl IngestionOrchestrator {
    pub fn new(
        ledger: StatusLedger,
        strategy: Arc<dyn LoadStrategy>,
        notifier: Notifier,
        settings: IngestSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            strategy,
            notifier,
            settings,
            clock,
        }
    }

    /// Ledger used by this orchestrator
    pub fn ledger(&self) -> &StatusLedger {
        &self.ledger
    }

    /// Handles a file-created trigger for `gs://{bucket}/{file_id}`
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the ledger cannot be read or written, and
    /// `Publish` if the outcome notification is rejected. In the latter case
    /// the ledger already holds the outcome.
    pub async fn ingest(&self, bucket: &BucketName, file_id: &FileId) -> Result<IngestOutcome> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "ingest",
            invocation_id = %invocation_id,
            bucket = %bucket,
            file_id = %file_id,
            strategy = self.strategy.name(),
        );
        self.run(bucket, file_id).instrument(span).await
    }

    async fn run(&self, bucket: &BucketName, file_id: &FileId) -> Result<IngestOutcome> {
        let source_uri = BlobUri::new(bucket.clone(), file_id.clone());
        crate::log_ingest_start!(bucket, file_id, self.strategy.name());

        if self.ledger.is_already_ingested(file_id).await? {
            self.ledger
                .record_duplicate_attempt(file_id, self.clock.now())
                .await?;
            crate::log_duplicate_skipped!(source_uri);
            return Ok(IngestOutcome::Duplicate);
        }

        let request = LoadRequest {
            file_id: file_id.clone(),
            source_uri,
            dataset: self.settings.dataset.clone(),
            table_prefix: self.settings.table_prefix.clone(),
            requested_at: self.clock.now(),
        };

        match self.strategy.load(&request).await {
            Ok(report) => {
                self.ledger.record_success(file_id, self.clock.now()).await?;
                self.notifier.publish_success(file_id, &report.target).await?;
                tracing::info!(
                    table = %report.target,
                    rows = ?report.rows,
                    "File '{}' ingested into {}",
                    file_id,
                    report.target
                );
                Ok(IngestOutcome::Loaded(report))
            }
            Err(e) => {
                let message = failure_message(file_id, &e.detail());
                self.ledger
                    .record_failure(file_id, &message, self.clock.now())
                    .await?;
                self.notifier.publish_failure(file_id, &message).await?;
                tracing::error!(error = %e, "{}", message);
                Ok(IngestOutcome::Failed { message })
            }
        }
    }
}
