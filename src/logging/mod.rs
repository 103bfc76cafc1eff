//! Logging and observability
//!
//! Structured logging via `tracing`: human-readable console output plus an
//! optional JSON file with rotation.
//!
//! # Example
//!
//! ```no_run
//! use sluice::logging::init_logging;
//! use sluice::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard, LOG_FILE_NAME};

/// Log the start of a single-file ingestion
///
/// # Example
///
/// ```no_run
/// use sluice::log_ingest_start;
/// use sluice::domain::{BucketName, FileId};
///
/// let bucket = BucketName::new("landing").unwrap();
/// let file_id = FileId::new("orders.csv").unwrap();
/// log_ingest_start!(&bucket, &file_id, "bulk_load");
/// ```
#[macro_export]
macro_rules! log_ingest_start {
    ($bucket:expr, $file_id:expr, $strategy:expr) => {
        tracing::info!(
            bucket = %$bucket,
            file_id = %$file_id,
            strategy = $strategy,
            "Starting ingestion"
        );
    };
}

/// Log a file that is skipped because it was already ingested
#[macro_export]
macro_rules! log_duplicate_skipped {
    ($file_path:expr) => {
        tracing::warn!(
            file_path = %$file_path,
            "Duplicate ingestion attempt"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use sluice::log_error_with_context;
/// use sluice::domain::SluiceError;
///
/// let error = SluiceError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
