//! Pub/Sub REST publisher

use crate::adapters::traits::Publisher;
use crate::config::{bearer_header, PubSubConfig};
use crate::domain::{Result, SluiceError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    messages: [OutgoingMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    data: String,
    attributes: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// `Publisher` over the Pub/Sub REST API
pub struct PubSubPublisher {
    client: Client,
    endpoint: String,
    auth: Option<String>,
}

impl PubSubPublisher {
    pub fn new(config: &PubSubConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SluiceError::Publish(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            auth: bearer_header(config.access_token.as_ref()),
        })
    }

    /// `{endpoint}/v1/{topic}:publish`
    pub fn publish_url(&self, topic: &str) -> String {
        format!("{}/v1/{topic}:publish", self.endpoint)
    }
}

#[async_trait]
impl Publisher for PubSubPublisher {
    async fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: &HashMap<String, String>,
    ) -> Result<String> {
        let body = PublishRequest {
            messages: [OutgoingMessage {
                data: STANDARD.encode(data),
                attributes,
            }],
        };

        let mut request = self.client.post(self.publish_url(topic)).json(&body);
        if let Some(auth) = &self.auth {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SluiceError::Publish(format!("{topic}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SluiceError::Publish(format!(
                "{topic}: publish failed with status {status}: {body}"
            )));
        }

        let parsed: PublishResponse = response
            .json()
            .await
            .map_err(|e| SluiceError::Publish(format!("{topic}: invalid response: {e}")))?;

        parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| SluiceError::Publish(format!("{topic}: no message id returned")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_url() {
        let publisher = PubSubPublisher::new(&PubSubConfig {
            endpoint: "http://localhost:8085/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            publisher.publish_url("projects/p/topics/t"),
            "http://localhost:8085/v1/projects/p/topics/t:publish"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let mut attributes = HashMap::new();
        attributes.insert("file_name".to_string(), "a.csv".to_string());
        let body = PublishRequest {
            messages: [OutgoingMessage {
                data: STANDARD.encode(b"hello"),
                attributes: &attributes,
            }],
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "messages": [{"data": "aGVsbG8=", "attributes": {"file_name": "a.csv"}}]
            })
        );
    }
}
