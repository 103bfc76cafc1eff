//! Domain error types
//!
//! This module defines the error hierarchy for Sluice. Errors are domain-specific
//! and don't expose third-party client types: adapters convert SDK and HTTP errors
//! into these variants at the boundary.

use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;

/// Main Sluice error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Configuration is present but invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Required configuration keys are missing (fatal at startup)
    #[error("Missing required configuration keys: {}", .0.join(", "))]
    ConfigMissing(Vec<String>),

    /// The document store backing the status ledger cannot be reached
    #[error("Status store unavailable: {0}")]
    StoreUnavailable(String),

    /// Object storage errors
    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),

    /// Analytical table storage errors
    #[error("Table storage error: {0}")]
    Table(#[from] TableError),

    /// Publishing a notification failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Malformed trigger payloads or identifiers
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

/// Object storage errors
#[derive(Debug, Error)]
pub enum BlobError {
    /// Blob does not exist
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// A blob URI could not be parsed
    #[error("Invalid blob URI: {0}")]
    InvalidUri(String),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },
}

/// Analytical table storage errors
#[derive(Debug, Error)]
pub enum TableError {
    /// Target table already exists
    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    /// The source file could not be read as the expected format
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Failed to connect to the table store
    #[error("Failed to connect to table store: {0}")]
    ConnectionFailed(String),

    /// A statement failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The operation did not finish before its deadline
    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    /// Streaming insert reported per-row errors
    #[error("{}", format_row_errors(.0))]
    RowErrors(Vec<RowInsertError>),
}

/// A single rejected row from a streaming insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowInsertError {
    /// Row identifier supplied with the insert
    pub row_id: String,

    /// Reason reported by the store
    pub reason: String,
}

fn format_row_errors(errors: &[RowInsertError]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{} row(s) rejected", errors.len()))
}

/// A failed load attempt
///
/// Load strategies return this instead of propagating the underlying error so the
/// orchestrator can record a uniform failure while keeping the original cause for
/// the ledger and the error notification.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct IngestError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl IngestError {
    /// Creates a load failure without an underlying cause
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a load failure wrapping the original cause
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the top-level message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the message followed by every error in the source chain
    ///
    /// This is the text recorded in the ledger and published to the error channel.
    pub fn detail(&self) -> String {
        let mut detail = self.message.clone();
        let mut current = self.source();
        while let Some(cause) = current {
            detail.push_str("\n  caused by: ");
            detail.push_str(&cause.to_string());
            current = cause.source();
        }
        detail
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SluiceError {
    fn from(err: std::io::Error) -> Self {
        SluiceError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SluiceError {
    fn from(err: serde_json::Error) -> Self {
        SluiceError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SluiceError {
    fn from(err: toml::de::Error) -> Self {
        SluiceError::Configuration(format!("TOML parse error: {err}"))
    }
}
