use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use blobsafe_core::ExecutionStrategy;
use blobsafe_storage::UnversionedBucket;

use super::BackupBucketAddress;
use crate::error::{BackupError, BackupResult};

/// A live bucket and its dedicated backup bucket.
#[async_trait]
pub trait BucketPair: Send + Sync {
    fn live_bucket_name(&self) -> &str;

    fn backup_bucket_name(&self) -> &str;

    /// Copy every live object under `backup_location` in the backup bucket.
    async fn backup(&self, backup_location: &str) -> BackupResult<BackupBucketAddress>;

    /// Copy every object under `backup_location` back into the live bucket.
    /// An empty location is an error.
    async fn restore(&self, backup_location: &str) -> BackupResult<()>;
}

pub struct UnversionedBucketPair {
    live: Arc<dyn UnversionedBucket>,
    backup: Arc<dyn UnversionedBucket>,
    strategy: ExecutionStrategy,
}

impl UnversionedBucketPair {
    pub fn new(
        live: Arc<dyn UnversionedBucket>,
        backup: Arc<dyn UnversionedBucket>,
        strategy: ExecutionStrategy,
    ) -> Self {
        UnversionedBucketPair {
            live,
            backup,
            strategy,
        }
    }

    fn address(&self, path: &str, empty_backup: bool) -> BackupBucketAddress {
        BackupBucketAddress {
            bucket_name: self.backup.name().to_string(),
            bucket_region: self.backup.region().to_string(),
            path: path.to_string(),
            empty_backup,
            same_bucket_as: None,
        }
    }
}

#[async_trait]
impl BucketPair for UnversionedBucketPair {
    fn live_bucket_name(&self) -> &str {
        self.live.name()
    }

    fn backup_bucket_name(&self) -> &str {
        self.backup.name()
    }

    async fn backup(&self, backup_location: &str) -> BackupResult<BackupBucketAddress> {
        let start = Instant::now();
        let files = self
            .live
            .list_files("")
            .await
            .map_err(|e| BackupError::storage(self.live.name(), e))?;

        if files.is_empty() {
            tracing::info!(
                bucket = %self.live.name(),
                "Live bucket is empty, nothing to copy"
            );
            return Ok(self.address(backup_location, true));
        }

        let backup = &self.backup;
        let live_name = self.live.name();
        let live_region = self.live.region();
        let errors = self
            .strategy
            .run(&files, |key| async move {
                backup
                    .copy_object(&key, "", backup_location, live_name, live_region)
                    .await
            })
            .await;

        if !errors.is_empty() {
            return Err(BackupError::copy_failed(
                format!("failed to backup bucket {}", live_name),
                errors,
            ));
        }

        tracing::info!(
            bucket = %live_name,
            backup_bucket = %backup.name(),
            path = %backup_location,
            files = files.len(),
            strategy = %self.strategy,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Bucket copied to backup bucket"
        );
        Ok(self.address(backup_location, false))
    }

    async fn restore(&self, backup_location: &str) -> BackupResult<()> {
        let start = Instant::now();
        let files = self
            .backup
            .list_files(backup_location)
            .await
            .map_err(|e| BackupError::storage(self.backup.name(), e))?;

        if files.is_empty() {
            return Err(BackupError::EmptyBackupLocation {
                location: backup_location.to_string(),
                bucket: self.backup.name().to_string(),
            });
        }

        let live = &self.live;
        let backup_name = self.backup.name();
        let backup_region = self.backup.region();
        let errors = self
            .strategy
            .run(&files, |key| async move {
                live.copy_object(&key, backup_location, "", backup_name, backup_region)
                    .await
            })
            .await;

        if !errors.is_empty() {
            return Err(BackupError::copy_failed(
                format!("failed to restore bucket {}", live.name()),
                errors,
            ));
        }

        tracing::info!(
            bucket = %live.name(),
            backup_bucket = %backup_name,
            path = %backup_location,
            files = files.len(),
            strategy = %self.strategy,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Bucket restored from backup bucket"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockUnversionedBucket;

    fn pair(
        live: MockUnversionedBucket,
        backup: MockUnversionedBucket,
        strategy: ExecutionStrategy,
    ) -> (
        UnversionedBucketPair,
        Arc<MockUnversionedBucket>,
        Arc<MockUnversionedBucket>,
    ) {
        let live = Arc::new(live);
        let backup = Arc::new(backup);
        (
            UnversionedBucketPair::new(live.clone(), backup.clone(), strategy),
            live,
            backup,
        )
    }

    fn copy(key: &str, from: &str, to: &str, bucket: &str, region: &str) -> (String, String, String, String, String) {
        (
            key.to_string(),
            from.to_string(),
            to.to_string(),
            bucket.to_string(),
            region.to_string(),
        )
    }

    #[tokio::test]
    async fn backup_copies_every_live_object_under_the_location() {
        for strategy in [ExecutionStrategy::Serial, ExecutionStrategy::parallel()] {
            let (pair, _, backup) = pair(
                MockUnversionedBucket::new("live", "live-region").with_files("", &["a", "dir/b"]),
                MockUnversionedBucket::new("backup", "backup-region"),
                strategy,
            );

            let address = pair.backup("ts/droplets").await.unwrap();

            assert_eq!(
                address,
                BackupBucketAddress {
                    bucket_name: "backup".to_string(),
                    bucket_region: "backup-region".to_string(),
                    path: "ts/droplets".to_string(),
                    empty_backup: false,
                    same_bucket_as: None,
                }
            );
            assert_eq!(
                backup.copies(),
                vec![
                    copy("a", "", "ts/droplets", "live", "live-region"),
                    copy("dir/b", "", "ts/droplets", "live", "live-region"),
                ]
            );
        }
    }

    #[tokio::test]
    async fn backup_of_empty_bucket_copies_nothing() {
        let (pair, _, backup) = pair(
            MockUnversionedBucket::new("live", "r"),
            MockUnversionedBucket::new("backup", "r"),
            ExecutionStrategy::Serial,
        );

        let address = pair.backup("ts/packages").await.unwrap();

        assert!(address.empty_backup);
        assert_eq!(address.path, "ts/packages");
        assert!(backup.copies().is_empty());
    }

    #[tokio::test]
    async fn backup_reports_every_failed_copy() {
        let mut backup = MockUnversionedBucket::new("backup", "r");
        backup.fail_copy_of = Some("b".to_string());
        let (pair, _, _) = pair(
            MockUnversionedBucket::new("live", "r").with_files("", &["a", "b"]),
            backup,
            ExecutionStrategy::Serial,
        );

        let err = pair.backup("ts/droplets").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to backup bucket live: failed to copy b into bucket backup: copy rejected"
        );
    }

    #[tokio::test]
    async fn restore_copies_objects_back_to_their_keys() {
        let (pair, live, _) = pair(
            MockUnversionedBucket::new("live", "r"),
            MockUnversionedBucket::new("backup", "backup-region")
                .with_files("ts/droplets", &["a", "dir/b"]),
            ExecutionStrategy::bounded(2),
        );

        pair.restore("ts/droplets").await.unwrap();

        assert_eq!(
            live.copies(),
            vec![
                copy("a", "ts/droplets", "", "backup", "backup-region"),
                copy("dir/b", "ts/droplets", "", "backup", "backup-region"),
            ]
        );
    }

    #[tokio::test]
    async fn restore_of_empty_location_is_an_error() {
        let (pair, live, _) = pair(
            MockUnversionedBucket::new("live", "r"),
            MockUnversionedBucket::new("backup", "r"),
            ExecutionStrategy::Serial,
        );

        let err = pair.restore("ts/droplets").await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "no files found in ts/droplets in bucket backup to restore"
        );
        assert!(live.copies().is_empty());
    }
}
