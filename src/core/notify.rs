//! Outcome notifications
//!
//! One message per ingestion attempt, on the success or the error topic. Each
//! message carries the file identifier in its `file_name` attribute.

use crate::adapters::traits::Publisher;
use crate::domain::events::FILE_NAME_ATTRIBUTE;
use crate::domain::ids::FileId;
use crate::domain::table::TableTarget;
use crate::domain::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Fully qualified topic path
pub fn topic_path(project: &str, topic: &str) -> String {
    format!("projects/{project}/topics/{topic}")
}

/// Text published when a file was loaded
pub fn success_message(file_id: &FileId, target: &TableTarget) -> String {
    format!("File '{file_id}' streamed into {target}")
}

/// Text published, and stored in the ledger, when a load failed
pub fn failure_message(file_id: &FileId, detail: &str) -> String {
    format!("Error ingesting file '{file_id}'. Cause: {detail}")
}

/// Publishes ingestion outcomes
pub struct Notifier {
    publisher: Arc<dyn Publisher + Send + Sync>,
    success_topic: String,
    error_topic: String,
}

impl Notifier {
    /// Create a notifier for two fully qualified topics
    pub fn new(
        publisher: Arc<dyn Publisher + Send + Sync>,
        success_topic: impl Into<String>,
        error_topic: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            success_topic: success_topic.into(),
            error_topic: error_topic.into(),
        }
    }

    pub fn success_topic(&self) -> &str {
        &self.success_topic
    }

    pub fn error_topic(&self) -> &str {
        &self.error_topic
    }

    /// Publishes `message` to `topic`, tagged with the file identifier
    ///
    /// Returns once the bus has accepted the message.
    pub async fn publish(&self, topic: &str, message: &str, file_id: &FileId) -> Result<String> {
        let attributes = HashMap::from([(
            FILE_NAME_ATTRIBUTE.to_string(),
            file_id.as_str().to_string(),
        )]);

        let message_id = self
            .publisher
            .publish(topic, message.as_bytes(), &attributes)
            .await?;

        tracing::debug!(topic = %topic, message_id = %message_id, file_id = %file_id, "Published notification");
        Ok(message_id)
    }

    /// Publishes the success message for a loaded file
    pub async fn publish_success(&self, file_id: &FileId, target: &TableTarget) -> Result<String> {
        let message = success_message(file_id, target);
        self.publish(&self.success_topic, &message, file_id).await
    }

    /// Publishes an already rendered failure message
    pub async fn publish_failure(&self, file_id: &FileId, message: &str) -> Result<String> {
        self.publish(&self.error_topic, message, file_id).await
    }
}
