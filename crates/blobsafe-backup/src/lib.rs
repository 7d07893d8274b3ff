//! Blobsafe backup engines
//!
//! Two engines share one shape: configuration is assembled into bucket
//! collaborators, a backuper produces one record per bucket identifier and
//! saves them as an artifact, and a restorer reads the artifact back.
//!
//! - [`versioned`] records version ids of buckets with versioning enabled.
//! - [`unversioned`] copies objects of plain buckets into backup buckets.

pub mod artifact;
pub mod assembly;
pub mod error;
pub mod unversioned;
pub mod versioned;

#[cfg(test)]
mod testing;

pub use artifact::{Artifact, FileArtifact};
pub use assembly::{build_bucket_pairs, build_restore_bucket_pairs, build_versioned_buckets};
pub use error::{BackupError, BackupResult, ErrorCategory};
pub use unversioned::{BackupBucketAddress, BackupBucketAddresses, BucketPair, UnversionedBucketPair};
pub use versioned::{BlobVersion, BucketSnapshot, BucketSnapshots};
