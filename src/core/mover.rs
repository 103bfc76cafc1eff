//! Blob relocation between buckets
//!
//! Copy then delete. The move is not atomic: a failed copy leaves the source
//! untouched, a failed delete leaves the blob in both buckets.

use crate::adapters::traits::BlobStore;
use crate::domain::ids::{BlobUri, BucketName, FileId};
use crate::domain::Result;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Moves blobs between buckets
pub struct FileMover {
    blobs: Arc<dyn BlobStore + Send + Sync>,
}

impl FileMover {
    pub fn new(blobs: Arc<dyn BlobStore + Send + Sync>) -> Self {
        Self { blobs }
    }

    /// Moves `file_id` from `source` to `destination`, keeping its name
    ///
    /// # Errors
    ///
    /// Returns the blob store error of the failing step.
    pub async fn move_file(
        &self,
        file_id: &FileId,
        source: &BucketName,
        destination: &BucketName,
    ) -> Result<BlobUri> {
        let span = tracing::info_span!(
            "move",
            invocation_id = %Uuid::new_v4(),
            file_id = %file_id,
        );

        self.relocate(file_id, source, destination)
            .instrument(span)
            .await
    }

    async fn relocate(
        &self,
        file_id: &FileId,
        source: &BucketName,
        destination: &BucketName,
    ) -> Result<BlobUri> {
        let from = BlobUri::new(source.clone(), file_id.clone());
        let to = BlobUri::new(destination.clone(), file_id.clone());

        tracing::info!(from = %from, to = %to, "Moving file");
        self.blobs.copy(&from, &to).await?;
        self.blobs.delete(&from).await.inspect_err(|e| {
            tracing::error!(
                from = %from,
                to = %to,
                error = %e,
                "Copied but could not delete source, file is in both buckets"
            );
        })?;
        tracing::info!(from = %from, to = %to, "File moved");
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{BlobOperation, MemoryBlobStore};
    use crate::domain::{BlobError, SluiceError};

    fn setup() -> (Arc<MemoryBlobStore>, FileMover) {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs.put(BlobUri::parse("gs://src/f.csv").unwrap(), "hash\n1");
        let mover = FileMover::new(blobs.clone());
        (blobs, mover)
    }

    fn names() -> (FileId, BucketName, BucketName) {
        (
            FileId::new("f.csv").unwrap(),
            BucketName::new("src").unwrap(),
            BucketName::new("dst").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_move_file() {
        let (blobs, mover) = setup();
        let (file_id, src, dst) = names();

        let moved = mover.move_file(&file_id, &src, &dst).await.unwrap();
        assert_eq!(moved.to_string(), "gs://dst/f.csv");
        assert!(!blobs.contains(&BlobUri::parse("gs://src/f.csv").unwrap()));
        assert!(blobs.contains(&moved));
    }

    #[tokio::test]
    async fn test_copy_failure_leaves_source() {
        let (blobs, mover) = setup();
        blobs.fail_on(BlobOperation::Copy, "forbidden");
        let (file_id, src, dst) = names();

        let err = mover.move_file(&file_id, &src, &dst).await.unwrap_err();
        assert!(matches!(err, SluiceError::Blob(BlobError::ServerError { .. })));
        assert!(blobs.contains(&BlobUri::parse("gs://src/f.csv").unwrap()));
        assert!(blobs.calls(BlobOperation::Delete).is_empty());
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (_, mover) = setup();
        let (_, src, dst) = names();
        let err = mover
            .move_file(&FileId::new("none.csv").unwrap(), &src, &dst)
            .await
            .unwrap_err();
        assert!(matches!(err, SluiceError::Blob(BlobError::NotFound(_))));
    }
}
