//! Backup engine for buckets that hold one copy per key.
//!
//! Each live bucket is paired with a dedicated backup bucket. Backup copies
//! every object into `<timestamp>/<identifier>/` inside the backup bucket;
//! restore copies them back.

mod backuper;
mod pair;
mod restorer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use backuper::Backuper;
pub use pair::{BucketPair, UnversionedBucketPair};
pub(crate) use restorer::check_identifiers;
pub use restorer::Restorer;

/// Where, and whether, the objects of one identifier were copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupBucketAddress {
    pub bucket_name: String,
    pub bucket_region: String,
    pub path: String,
    /// The live bucket had no objects at backup time.
    pub empty_backup: bool,
    /// Set when this identifier's live bucket is the same physical bucket as
    /// another identifier's; nothing was copied for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_bucket_as: Option<String>,
}

impl BackupBucketAddress {
    pub fn alias_of(canonical: impl Into<String>) -> Self {
        BackupBucketAddress {
            same_bucket_as: Some(canonical.into()),
            ..Default::default()
        }
    }

    pub fn is_alias(&self) -> bool {
        self.same_bucket_as.is_some()
    }
}

pub type BackupBucketAddresses = HashMap<String, BackupBucketAddress>;
