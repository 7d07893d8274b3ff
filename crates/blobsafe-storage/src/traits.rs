//! Bucket capability traits
//!
//! This module defines the traits every vendor bucket implementation must
//! provide. The engines only talk to buckets through these traits, which lets
//! them be tested against in-memory fakes.

use async_trait::async_trait;
use std::io;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to list objects in bucket {bucket}: {reason}")]
    ListFailed { bucket: String, reason: String },

    #[error("failed to copy {key} into bucket {bucket}: {reason}")]
    CopyFailed {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("could not check if bucket {bucket} is versioned: {reason}")]
    VersioningCheckFailed { bucket: String, reason: String },

    #[error("bucket {0} is not versioned")]
    NotVersioned(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One entry of a bucket's version listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub key: String,
    pub id: String,
    /// Whether this is the current head version of `key`.
    pub is_latest: bool,
}

/// A bucket that keeps multiple live versions per key.
#[async_trait]
pub trait VersionedBucket: Send + Sync {
    fn name(&self) -> &str;

    fn region(&self) -> &str;

    /// Every object version the bucket currently holds.
    async fn list_versions(&self) -> StorageResult<Vec<Version>>;

    /// Copy one exact version of `blob_key` from the origin bucket into this
    /// bucket under the same key. The copy becomes the new current version;
    /// existing versions are left in place.
    async fn copy_version(
        &self,
        blob_key: &str,
        version_id: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()>;

    /// Fail unless versioning is enabled on the bucket.
    async fn check_if_versioned(&self) -> StorageResult<()>;
}

/// A bucket that holds one copy per key.
#[async_trait]
pub trait UnversionedBucket: Send + Sync {
    fn name(&self) -> &str;

    fn region(&self) -> &str;

    /// Keys under `prefix`, relative to it. An empty prefix lists the whole bucket.
    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Copy `origin_prefix/key` from the origin bucket to
    /// `destination_prefix/key` in this bucket, overwriting any existing object.
    async fn copy_object(
        &self,
        key: &str,
        origin_prefix: &str,
        destination_prefix: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()>;

    async fn is_versioned(&self) -> StorageResult<bool>;
}
