use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use blobsafe_storage::VersionedBucket;

use super::{BucketSnapshot, BucketSnapshots};
use crate::artifact::Artifact;
use crate::error::{BackupError, BackupResult};

/// Copies recorded versions back into the configured buckets.
pub struct Restorer {
    buckets: HashMap<String, Arc<dyn VersionedBucket>>,
    artifact: Arc<dyn Artifact<BucketSnapshot>>,
}

impl Restorer {
    pub fn new(
        buckets: HashMap<String, Arc<dyn VersionedBucket>>,
        artifact: Arc<dyn Artifact<BucketSnapshot>>,
    ) -> Self {
        Restorer { buckets, artifact }
    }

    pub async fn run(&self) -> BackupResult<()> {
        let snapshots = self.artifact.load().await?;
        self.restore_from(&snapshots).await
    }

    /// Restore every configured bucket from `snapshots`.
    ///
    /// Identifiers must match one to one before anything is checked or
    /// copied. The run stops at the first failure; versions already copied
    /// stay in place.
    pub async fn restore_from(&self, snapshots: &BucketSnapshots) -> BackupResult<()> {
        let start = Instant::now();
        let mut identifiers: Vec<&String> = self.buckets.keys().collect();
        identifiers.sort();

        let mut recorded: Vec<&String> = snapshots.keys().collect();
        recorded.sort();
        if let Some(unknown) = recorded.into_iter().find(|id| !self.buckets.contains_key(*id)) {
            return Err(BackupError::SnapshotNotConfigured(unknown.clone()));
        }

        if let Some(missing) = identifiers.iter().find(|id| !snapshots.contains_key(**id)) {
            return Err(BackupError::SnapshotMissing((*missing).clone()));
        }

        for identifier in &identifiers {
            let bucket = &self.buckets[*identifier];
            let snapshot = snapshots
                .get(*identifier)
                .ok_or_else(|| BackupError::SnapshotMissing((*identifier).clone()))?;

            bucket
                .check_if_versioned()
                .await
                .map_err(|e| BackupError::storage(identifier, e))?;

            restore_bucket(identifier, bucket.as_ref(), snapshot).await?;
        }

        tracing::info!(
            buckets = identifiers.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Versioned restore complete"
        );
        Ok(())
    }
}

async fn restore_bucket(
    identifier: &str,
    bucket: &dyn VersionedBucket,
    snapshot: &BucketSnapshot,
) -> BackupResult<()> {
    for version in &snapshot.versions {
        bucket
            .copy_version(
                &version.blob_key,
                &version.id,
                &snapshot.bucket_name,
                &snapshot.region_name,
            )
            .await
            .map_err(|e| BackupError::storage(identifier, e))?;

        tracing::debug!(
            identifier = %identifier,
            key = %version.blob_key,
            version_id = %version.id,
            "Version restored"
        );
    }

    tracing::info!(
        identifier = %identifier,
        bucket = %bucket.name(),
        origin_bucket = %snapshot.bucket_name,
        versions = snapshot.versions.len(),
        "Bucket restored"
    );
    Ok(())
}
