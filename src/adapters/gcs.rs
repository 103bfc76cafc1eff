//! Cloud Storage JSON API client

use crate::adapters::traits::{BlobMeta, BlobStore};
use crate::config::{bearer_header, GcsConfig};
use crate::domain::ids::BlobUri;
use crate::domain::{BlobError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Object metadata as returned by the API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    /// Decimal string
    size: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
}

/// Maps a non-success response to a blob error
async fn status_error(uri: &BlobUri, response: Response) -> BlobError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => BlobError::NotFound(uri.to_string()),
        s if s.is_server_error() => BlobError::ServerError {
            status: s.as_u16(),
            message: body,
        },
        s => BlobError::ClientError {
            status: s.as_u16(),
            message: body,
        },
    }
}

/// `BlobStore` over the Cloud Storage JSON API
pub struct GcsBlobStore {
    client: Client,
    base: Url,
    auth: Option<String>,
}

impl GcsBlobStore {
    /// # Errors
    ///
    /// Returns `InvalidUri` if the endpoint does not parse and `RequestFailed`
    /// if the HTTP client cannot be built.
    pub fn new(config: &GcsConfig) -> Result<Self> {
        let base = Url::parse(&config.endpoint)
            .map_err(|e| BlobError::InvalidUri(format!("{}: {e}", config.endpoint)))?;
        if base.cannot_be_a_base() {
            return Err(BlobError::InvalidUri(config.endpoint.clone()).into());
        }

        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BlobError::RequestFailed(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            auth: bearer_header(config.access_token.as_ref()),
        })
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o/{object}` with each part as one segment
    fn object_url(&self, uri: &BlobUri) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", uri.bucket.as_str(), "o", uri.name.as_str()]);
        }
        url
    }

    fn copy_url(&self, source: &BlobUri, destination: &BlobUri) -> Url {
        let mut url = self.object_url(source);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend([
                "copyTo",
                "b",
                destination.bucket.as_str(),
                "o",
                destination.name.as_str(),
            ]);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(auth) => request.header(reqwest::header::AUTHORIZATION, auth),
            None => request,
        }
    }

    async fn send(&self, uri: &BlobUri, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| BlobError::RequestFailed(format!("{uri}: {e}")))?;
        Ok(response)
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn get(&self, uri: &BlobUri) -> Result<Bytes> {
        let mut url = self.object_url(uri);
        url.query_pairs_mut().append_pair("alt", "media");

        tracing::debug!(blob = %uri, "Downloading blob");
        let response = self.send(uri, self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(status_error(uri, response).await.into());
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| BlobError::RequestFailed(format!("{uri}: {e}")))?;
        Ok(data)
    }

    async fn head(&self, uri: &BlobUri) -> Result<Option<BlobMeta>> {
        let response = self.send(uri, self.client.get(self.object_url(uri))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(uri, response).await.into());
        }

        let resource: ObjectResource = response
            .json()
            .await
            .map_err(|e| BlobError::RequestFailed(format!("{uri}: invalid metadata: {e}")))?;

        Ok(Some(BlobMeta {
            uri: uri.clone(),
            size: resource.size.parse().unwrap_or(0),
            content_type: resource.content_type,
            updated: resource.updated,
        }))
    }

    async fn copy(&self, source: &BlobUri, destination: &BlobUri) -> Result<()> {
        tracing::debug!(source = %source, destination = %destination, "Copying blob");
        let request = self
            .client
            .post(self.copy_url(source, destination))
            .json(&serde_json::json!({}));

        let response = self.send(source, request).await?;
        if !response.status().is_success() {
            return Err(status_error(source, response).await.into());
        }
        Ok(())
    }

    async fn delete(&self, uri: &BlobUri) -> Result<()> {
        tracing::debug!(blob = %uri, "Deleting blob");
        let response = self
            .send(uri, self.client.delete(self.object_url(uri)))
            .await?;
        if !response.status().is_success() {
            return Err(status_error(uri, response).await.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{BucketName, FileId};

    fn store(endpoint: &str) -> GcsBlobStore {
        GcsBlobStore::new(&GcsConfig {
            endpoint: endpoint.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn uri(bucket: &str, name: &str) -> BlobUri {
        BlobUri::new(BucketName::new(bucket).unwrap(), FileId::new(name).unwrap())
    }

    #[test]
    fn test_object_url_encodes_slashes_in_names() {
        let url = store("https://storage.googleapis.com").object_url(&uri("bkt", "daily/a b.csv"));
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/bkt/o/daily%2Fa%20b.csv"
        );
    }

    #[test]
    fn test_copy_url() {
        let url = store("http://localhost:4443/")
            .copy_url(&uri("landing", "a.csv"), &uri("archive", "a.csv"));
        assert_eq!(
            url.as_str(),
            "http://localhost:4443/storage/v1/b/landing/o/a.csv/copyTo/b/archive/o/a.csv"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = GcsBlobStore::new(&GcsConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
