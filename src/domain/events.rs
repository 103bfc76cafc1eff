//! Trigger payloads
//!
//! The two inbound events: a file landing in a bucket, and a request to move a
//! file between buckets.

use crate::domain::errors::SluiceError;
use crate::domain::ids::{BucketName, FileId};
use crate::domain::result::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute carrying the file identifier on move requests and notifications
pub const FILE_NAME_ATTRIBUTE: &str = "file_name";

/// Object-created notification from the blob store
///
/// Only `bucket` and `name` are read. Any other fields the store sends along
/// (generation, size, content type...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCreatedEvent {
    pub bucket: String,
    pub name: String,
}

impl FileCreatedEvent {
    /// Parses an event from its JSON body
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| SluiceError::Validation(format!("Malformed file-created event: {e}")))
    }

    /// Validated bucket and file identifier
    pub fn target(&self) -> Result<(BucketName, FileId)> {
        let bucket = BucketName::new(&self.bucket).map_err(SluiceError::Validation)?;
        let file_id = FileId::new(&self.name).map_err(SluiceError::Validation)?;
        Ok((bucket, file_id))
    }
}

/// Message asking for a blob to be relocated
///
/// `data` is base64 encoded UTF-8 text, logged but otherwise unused. The file to
/// move comes from the `file_name` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub data: String,

    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl MoveRequest {
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| SluiceError::Validation(format!("Malformed move request: {e}")))
    }

    /// Decodes the message body
    pub fn decode_message(&self) -> Result<String> {
        let bytes = STANDARD
            .decode(self.data.trim())
            .map_err(|e| SluiceError::Validation(format!("Message data is not base64: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| SluiceError::Validation(format!("Message data is not UTF-8: {e}")))
    }

    /// File identifier from the `file_name` attribute
    pub fn file_name(&self) -> Result<FileId> {
        let name = self.attributes.get(FILE_NAME_ATTRIBUTE).ok_or_else(|| {
            SluiceError::Validation(format!(
                "Move request has no '{FILE_NAME_ATTRIBUTE}' attribute"
            ))
        })?;
        FileId::new(name).map_err(SluiceError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_created_event_ignores_extra_fields() {
        let event = FileCreatedEvent::from_json(
            r#"{"bucket":"bkt","name":"a.csv","generation":"17","size":"42"}"#,
        )
        .unwrap();
        let (bucket, file_id) = event.target().unwrap();
        assert_eq!(bucket.as_str(), "bkt");
        assert_eq!(file_id.as_str(), "a.csv");
    }

    #[test]
    fn test_file_created_event_requires_name() {
        let err = FileCreatedEvent::from_json(r#"{"bucket":"bkt"}"#).unwrap_err();
        assert!(matches!(err, SluiceError::Validation(_)));
    }

    #[test]
    fn test_file_created_event_rejects_blank_name() {
        let event = FileCreatedEvent {
            bucket: "bkt".to_string(),
            name: " ".to_string(),
        };
        assert!(event.target().is_err());
    }

    #[test]
    fn test_move_request_decodes_message() {
        let request = MoveRequest::from_json(
            r#"{"data":"bW92ZSBpdA==","attributes":{"file_name":"f.csv"}}"#,
        )
        .unwrap();
        assert_eq!(request.decode_message().unwrap(), "move it");
        assert_eq!(request.file_name().unwrap().as_str(), "f.csv");
    }

    #[test]
    fn test_move_request_without_file_name() {
        let request = MoveRequest::from_json(r#"{"data":""}"#).unwrap();
        let err = request.file_name().unwrap_err();
        assert!(err.to_string().contains("file_name"));
    }

    #[test]
    fn test_move_request_invalid_base64() {
        let request = MoveRequest {
            data: "%%%".to_string(),
            attributes: HashMap::new(),
        };
        assert!(request.decode_message().is_err());
    }
}
