//! Blobsafe Core Library
//!
//! This crate provides the pieces shared by every blobsafe component: bucket
//! configuration, the backup path helper, the run clock and the execution
//! strategy used to copy many objects.

pub mod blobpath;
pub mod clock;
pub mod config;
pub mod error;
pub mod execution;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    load_bucket_configs, BackupBucketConfig, BucketConfig, UnversionedBucketConfig,
};
pub use error::{ConfigError, LogLevel};
pub use execution::ExecutionStrategy;
pub use storage_types::{BucketSpec, Credentials, StorageBackend};
