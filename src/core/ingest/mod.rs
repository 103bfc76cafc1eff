//! File ingestion
//!
//! - [`strategy`] - Pluggable load strategies
//! - [`orchestrator`] - Ledger-guarded ingestion state machine

pub mod orchestrator;
pub mod strategy;

pub use orchestrator::{IngestOutcome, IngestSettings, IngestionOrchestrator};
pub use strategy::{
    create_strategy, BulkLoadStrategy, ExternalTableStrategy, LoadReport, LoadRequest,
    LoadStrategy, LoadStrategyKind, StreamingInsertStrategy,
};
