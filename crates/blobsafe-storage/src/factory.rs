#[cfg(feature = "storage-local")]
use crate::LocalBucketFactory;
#[cfg(feature = "storage-s3")]
use crate::S3BucketFactory;
use crate::{StorageBackend, StorageError, StorageResult, UnversionedBucket, VersionedBucket};
use async_trait::async_trait;
use blobsafe_core::BucketSpec;
use std::path::Path;
use std::sync::Arc;

/// Builds bucket handles from a [`BucketSpec`].
#[async_trait]
pub trait BucketFactory: Send + Sync {
    async fn versioned_bucket(&self, spec: &BucketSpec) -> StorageResult<Arc<dyn VersionedBucket>>;

    async fn unversioned_bucket(
        &self,
        spec: &BucketSpec,
    ) -> StorageResult<Arc<dyn UnversionedBucket>>;
}

/// Create a bucket factory for the configured backend
pub async fn create_bucket_factory(
    backend: StorageBackend,
    local_storage_path: Option<&Path>,
) -> StorageResult<Arc<dyn BucketFactory>> {
    match backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let _ = local_storage_path;
            Ok(Arc::new(S3BucketFactory))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let root = local_storage_path.ok_or_else(|| {
                StorageError::ConfigError("local storage path not configured".to_string())
            })?;
            let factory = LocalBucketFactory::new(root).await?;
            Ok(Arc::new(factory))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
