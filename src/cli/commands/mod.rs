//! CLI command implementations
//!
//! Every command returns a process exit code:
//! 0 success, 2 configuration or input error, 4 store or connection error,
//! 5 anything else.

pub mod ingest;
pub mod init;
pub mod mover;
pub mod status;
pub mod validate;

use crate::domain::SluiceError;
use std::io::Read;

pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_CONNECTION: i32 = 4;
pub const EXIT_FATAL: i32 = 5;

/// Exit code for an error that stopped a command
pub fn exit_code(error: &SluiceError) -> i32 {
    match error {
        SluiceError::Configuration(_)
        | SluiceError::ConfigMissing(_)
        | SluiceError::Validation(_) => EXIT_CONFIG,
        SluiceError::StoreUnavailable(_) | SluiceError::Blob(_) | SluiceError::Table(_) => {
            EXIT_CONNECTION
        }
        _ => EXIT_FATAL,
    }
}

/// Reads a payload from a file, or from stdin when `source` is `-`
pub fn read_input(source: &str) -> std::io::Result<String> {
    if source == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlobError, TableError};
    use std::io::Write;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&SluiceError::ConfigMissing(vec!["dataset".into()])), 2);
        assert_eq!(exit_code(&SluiceError::Validation("bad".into())), 2);
        assert_eq!(exit_code(&SluiceError::StoreUnavailable("down".into())), 4);
        assert_eq!(exit_code(&BlobError::NotFound("gs://b/a".into()).into()), 4);
        assert_eq!(exit_code(&TableError::Timeout("30s".into()).into()), 4);
        assert_eq!(exit_code(&SluiceError::Publish("rejected".into())), 5);
    }

    #[test]
    fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"bucket":"b","name":"a.csv"}"#).unwrap();

        let contents = read_input(&file.path().to_string_lossy()).unwrap();
        assert!(contents.contains("a.csv"));
    }
}
