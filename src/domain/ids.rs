//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the pipeline: the file
//! identifier (the ledger key) and bucket names, plus the `gs://` URI form of a blob.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

const BLOB_SCHEME: &str = "gs";

/// File identifier newtype wrapper
///
/// The object name of a blob inside its bucket. It doubles as the unique key of
/// the file's ingestion record.
///
/// # Examples
///
/// ```
/// use sluice::domain::ids::FileId;
/// use std::str::FromStr;
///
/// let file_id = FileId::from_str("blocks/2024-01-01.csv").unwrap();
/// assert_eq!(file_id.as_str(), "blocks/2024-01-01.csv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    /// Creates a new FileId from a string
    ///
    /// # Errors
    ///
    /// Returns `Err` if the identifier is empty or blank
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("File ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the file ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bucket name newtype wrapper
///
/// Accepts either a bare bucket name or a `gs://bucket` URI, which is how bucket
/// identifiers arrive through the environment.
///
/// # Examples
///
/// ```
/// use sluice::domain::ids::BucketName;
///
/// let bucket = BucketName::new("gs://ingest-archive").unwrap();
/// assert_eq!(bucket.as_str(), "ingest-archive");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketName(String);

impl BucketName {
    /// Creates a new BucketName, stripping an optional `gs://` scheme
    ///
    /// # Errors
    ///
    /// Returns `Err` if the name is empty, contains a path, or the URI is malformed
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let name = name.trim();

        let bare = if name.contains("://") {
            let url = Url::parse(name).map_err(|e| format!("Invalid bucket URI '{name}': {e}"))?;
            if url.scheme() != BLOB_SCHEME {
                return Err(format!(
                    "Unsupported bucket scheme '{}', expected {BLOB_SCHEME}://",
                    url.scheme()
                ));
            }
            if !matches!(url.path(), "" | "/") {
                return Err(format!("Bucket URI '{name}' must not contain an object path"));
            }
            url.host_str().unwrap_or_default().to_string()
        } else {
            name.to_string()
        };

        if bare.is_empty() {
            return Err("Bucket name cannot be empty".to_string());
        }
        if bare.contains('/') {
            return Err(format!("Bucket name '{bare}' must not contain '/'"));
        }
        Ok(Self(bare))
    }

    /// Returns the bucket name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BucketName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Location of a blob in `gs://{bucket}/{name}` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUri {
    /// Bucket holding the blob
    pub bucket: BucketName,

    /// Object name inside the bucket
    pub name: FileId,
}

impl BlobUri {
    /// Creates a URI from its parts
    pub fn new(bucket: BucketName, name: FileId) -> Self {
        Self { bucket, name }
    }

    /// Parses a `gs://bucket/object/name` URI
    ///
    /// The object name is taken verbatim so names containing `/` survive intact.
    pub fn parse(uri: &str) -> Result<Self, String> {
        let rest = uri
            .strip_prefix("gs://")
            .ok_or_else(|| format!("Blob URI '{uri}' must start with gs://"))?;
        let (bucket, name) = rest
            .split_once('/')
            .ok_or_else(|| format!("Blob URI '{uri}' has no object name"))?;
        Ok(Self {
            bucket: BucketName::new(bucket)?,
            name: FileId::new(name)?,
        })
    }
}

impl fmt::Display for BlobUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{BLOB_SCHEME}://{}/{}", self.bucket, self.name)
    }
}
