//! Domain models and types for Sluice.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`FileId`], [`BucketName`], [`BlobUri`])
//! - **Ledger records** ([`IngestionRecord`])
//! - **Table targets** ([`TableTarget`], [`FIXED_SCHEMA`])
//! - **Trigger payloads** ([`FileCreatedEvent`], [`MoveRequest`])
//! - **Error types** ([`SluiceError`], [`BlobError`], [`TableError`], [`IngestError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SluiceError>`]:
//!
//! ```rust
//! use sluice::domain::{FileId, Result, SluiceError};
//!
//! fn parse(name: &str) -> Result<FileId> {
//!     FileId::new(name).map_err(SluiceError::Validation)
//! }
//!
//! assert!(parse("a.csv").is_ok());
//! assert!(parse("").is_err());
//! ```

pub mod errors;
pub mod events;
pub mod ids;
pub mod record;
pub mod result;
pub mod table;

// Re-export commonly used types for convenience
pub use errors::{BlobError, IngestError, RowInsertError, SluiceError, TableError};
pub use events::{FileCreatedEvent, MoveRequest, FILE_NAME_ATTRIBUTE};
pub use ids::{BlobUri, BucketName, FileId};
pub use record::IngestionRecord;
pub use result::Result;
pub use table::{table_suffix, FieldType, SchemaField, TableTarget, FIXED_SCHEMA};
