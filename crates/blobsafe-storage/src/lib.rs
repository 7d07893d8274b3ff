//! Blobsafe Storage Library
//!
//! This crate provides the bucket capabilities the backup engines depend on and
//! their vendor implementations.
//!
//! - [`VersionedBucket`]: a bucket that keeps every version of an object. Backup
//!   records version ids; restore copies those exact versions back.
//! - [`UnversionedBucket`]: a bucket that keeps one copy per key. Backup copies
//!   objects into a dedicated backup bucket.
//!
//! Handles are built from a [`blobsafe_core::BucketSpec`] through a
//! [`BucketFactory`], so the engines never see vendor types.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use blobsafe_core::StorageBackend;
pub use factory::{create_bucket_factory, BucketFactory};
#[cfg(feature = "storage-local")]
pub use local::{LocalBucket, LocalBucketFactory};
#[cfg(feature = "storage-s3")]
pub use s3::{S3Bucket, S3BucketFactory};
pub use traits::{StorageError, StorageResult, UnversionedBucket, Version, VersionedBucket};
