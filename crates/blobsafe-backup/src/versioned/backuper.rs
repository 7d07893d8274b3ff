use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use blobsafe_storage::VersionedBucket;

use super::{BlobVersion, BucketSnapshot, BucketSnapshots, NULL_VERSION_ID};
use crate::artifact::Artifact;
use crate::error::{BackupError, BackupResult};

/// Records the current version of every object of every configured bucket.
pub struct Backuper {
    buckets: HashMap<String, Arc<dyn VersionedBucket>>,
    artifact: Arc<dyn Artifact<BucketSnapshot>>,
}

impl Backuper {
    pub fn new(
        buckets: HashMap<String, Arc<dyn VersionedBucket>>,
        artifact: Arc<dyn Artifact<BucketSnapshot>>,
    ) -> Self {
        Backuper { buckets, artifact }
    }

    /// Snapshot every bucket, then save the snapshots. Nothing is saved if
    /// any bucket fails.
    pub async fn run(&self) -> BackupResult<BucketSnapshots> {
        let start = Instant::now();
        let snapshots = self.backup().await?;
        self.artifact.save(&snapshots).await?;

        tracing::info!(
            buckets = snapshots.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Versioned backup complete"
        );
        Ok(snapshots)
    }

    pub async fn backup(&self) -> BackupResult<BucketSnapshots> {
        let mut identifiers: Vec<&String> = self.buckets.keys().collect();
        identifiers.sort();

        let mut snapshots = HashMap::with_capacity(identifiers.len());
        for identifier in identifiers {
            let bucket = &self.buckets[identifier];
            let snapshot = snapshot_bucket(identifier, bucket.as_ref()).await?;

            tracing::info!(
                identifier = %identifier,
                bucket = %snapshot.bucket_name,
                versions = snapshot.versions.len(),
                "Bucket versions recorded"
            );
            snapshots.insert(identifier.clone(), snapshot);
        }
        Ok(snapshots)
    }
}

/// Latest version of every key in `bucket`.
///
/// Fails if any latest version carries the `null` id, since such an object
/// cannot be restored by version.
pub async fn snapshot_bucket(
    identifier: &str,
    bucket: &dyn VersionedBucket,
) -> BackupResult<BucketSnapshot> {
    let versions = bucket
        .list_versions()
        .await
        .map_err(|e| BackupError::storage(identifier, e))?;

    let mut latest = Vec::new();
    for version in versions.into_iter().filter(|v| v.is_latest) {
        if version.id == NULL_VERSION_ID {
            return Err(BackupError::NullVersionId(bucket.name().to_string()));
        }
        latest.push(BlobVersion::new(version.key, version.id));
    }

    Ok(BucketSnapshot {
        bucket_name: bucket.name().to_string(),
        region_name: bucket.region().to_string(),
        versions: latest,
    })
}
