//! Backup engine for buckets with versioning enabled.
//!
//! Backup records the id of the current version of every object; no bytes
//! move. Restore copies each recorded version back, creating a new current
//! version at the destination.

mod backuper;
mod restorer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use backuper::{snapshot_bucket, Backuper};
pub use restorer::Restorer;

/// Vendor sentinel for objects written before versioning was enabled.
pub const NULL_VERSION_ID: &str = "null";

/// One immutable version of one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobVersion {
    pub blob_key: String,
    #[serde(rename = "version_id")]
    pub id: String,
}

impl BlobVersion {
    pub fn new(blob_key: impl Into<String>, id: impl Into<String>) -> Self {
        BlobVersion {
            blob_key: blob_key.into(),
            id: id.into(),
        }
    }
}

/// A bucket's identity plus the latest version of each of its objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub bucket_name: String,
    pub region_name: String,
    pub versions: Vec<BlobVersion>,
}

pub type BucketSnapshots = HashMap<String, BucketSnapshot>;
