//! Move command implementation
//!
//! Relocates the file named by a move-request message from the source bucket
//! to the destination bucket.

use super::{exit_code, read_input, EXIT_CONFIG, EXIT_OK};
use crate::adapters::factory::create_blob_store;
use crate::config::{load_config, MoverConfig};
use crate::core::mover::FileMover;
use crate::domain::{BucketName, MoveRequest, Result, SluiceError};
use clap::Args;

/// Arguments for the move command
#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Move-request message as JSON (`{"data": ..., "attributes": {"file_name": ...}}`), or `-` for stdin
    #[arg(long, default_value = "-")]
    pub message: String,
}

/// Source and destination buckets from configuration
pub fn buckets(config: &MoverConfig) -> Result<(BucketName, BucketName)> {
    let bucket = |value: &Option<String>, name: &str| -> Result<BucketName> {
        let value = value.as_deref().ok_or_else(|| {
            SluiceError::Configuration(format!(
                "{name} is not set (environment or [mover] section)"
            ))
        })?;
        BucketName::new(value).map_err(SluiceError::Configuration)
    };

    Ok((
        bucket(&config.source_bucket, "source bucket")?,
        bucket(&config.destination_bucket, "destination bucket")?,
    ))
}

impl MoveArgs {
    /// Execute the move command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let request = match read_input(&self.message)
            .map_err(SluiceError::from)
            .and_then(|body| MoveRequest::from_json(&body))
        {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Invalid move request");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };

        match request.decode_message() {
            Ok(text) => tracing::info!(message = %text, "Move request received"),
            Err(e) => tracing::warn!(error = %e, "Move request body could not be decoded"),
        }

        let file_id = match request.file_name() {
            Ok(f) => f,
            Err(e) => {
                println!("❌ Invalid move request");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let (source, destination) = match buckets(&config.mover) {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Mover buckets are not configured");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let blobs = match create_blob_store(&config) {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to create storage client");
                println!("   Error: {e}");
                return Ok(exit_code(&e));
            }
        };

        match FileMover::new(blobs)
            .move_file(&file_id, &source, &destination)
            .await
        {
            Ok(uri) => {
                println!("✅ Moved '{file_id}' to {uri}");
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to move '{file_id}' from {source} to {destination}");
                println!("   Error: {e}");
                Ok(exit_code(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_strip_scheme() {
        let config = MoverConfig {
            source_bucket: Some("gs://landing".to_string()),
            destination_bucket: Some("archive".to_string()),
        };

        let (source, destination) = buckets(&config).unwrap();
        assert_eq!(source.as_str(), "landing");
        assert_eq!(destination.as_str(), "archive");
    }

    #[test]
    fn test_buckets_missing_destination() {
        let config = MoverConfig {
            source_bucket: Some("landing".to_string()),
            destination_bucket: None,
        };

        let err = buckets(&config).unwrap_err();
        assert!(err.to_string().contains("destination bucket"));
    }
}
