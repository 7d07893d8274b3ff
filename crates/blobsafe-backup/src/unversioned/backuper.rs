use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use blobsafe_core::{blobpath, Clock};

use super::{BackupBucketAddress, BackupBucketAddresses, BucketPair};
use crate::artifact::Artifact;
use crate::error::{BackupError, BackupResult};

/// Copies every configured live bucket into its backup bucket.
pub struct Backuper {
    pairs: HashMap<String, Arc<dyn BucketPair>>,
    artifact: Arc<dyn Artifact<BackupBucketAddress>>,
    clock: Arc<dyn Clock>,
}

impl Backuper {
    pub fn new(
        pairs: HashMap<String, Arc<dyn BucketPair>>,
        artifact: Arc<dyn Artifact<BackupBucketAddress>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Backuper {
            pairs,
            artifact,
            clock,
        }
    }

    /// Back up every pair under one timestamp, then save the addresses.
    /// Nothing is saved if any pair fails.
    pub async fn run(&self) -> BackupResult<BackupBucketAddresses> {
        let start = Instant::now();
        self.check_pairs()?;

        let timestamp = self.clock.now();
        let aliases = self.aliases();

        let mut identifiers: Vec<&String> = self.pairs.keys().collect();
        identifiers.sort();

        let mut addresses = HashMap::with_capacity(identifiers.len());
        for identifier in identifiers {
            if let Some(canonical) = aliases.get(identifier) {
                tracing::info!(
                    identifier = %identifier,
                    same_bucket_as = %canonical,
                    "Live bucket already backed up under another identifier"
                );
                addresses.insert(identifier.clone(), BackupBucketAddress::alias_of(canonical));
                continue;
            }

            let location = blobpath::join(&timestamp, identifier);
            let address = self.pairs[identifier].backup(&location).await?;
            addresses.insert(identifier.clone(), address);
        }

        self.artifact.save(&addresses).await?;

        tracing::info!(
            buckets = addresses.len(),
            timestamp = %timestamp,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Unversioned backup complete"
        );
        Ok(addresses)
    }

    /// A live bucket must differ from its own backup bucket and from every
    /// other pair's backup bucket.
    fn check_pairs(&self) -> BackupResult<()> {
        let mut identifiers: Vec<&String> = self.pairs.keys().collect();
        identifiers.sort();

        for identifier in &identifiers {
            let pair = &self.pairs[*identifier];
            if pair.live_bucket_name() == pair.backup_bucket_name() {
                return Err(BackupError::SameLiveAndBackupBucket((*identifier).clone()));
            }
        }

        for live_identifier in &identifiers {
            let live_bucket = self.pairs[*live_identifier].live_bucket_name();
            for backup_identifier in &identifiers {
                if self.pairs[*backup_identifier].backup_bucket_name() == live_bucket {
                    return Err(BackupError::BackupBucketIsLiveBucket {
                        backup_identifier: (*backup_identifier).clone(),
                        live_identifier: (*live_identifier).clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Identifiers whose live bucket is also another identifier's live
    /// bucket, mapped to the first such identifier in sorted order.
    fn aliases(&self) -> HashMap<String, String> {
        let mut by_bucket: HashMap<&str, Vec<&String>> = HashMap::new();
        for (identifier, pair) in &self.pairs {
            by_bucket
                .entry(pair.live_bucket_name())
                .or_default()
                .push(identifier);
        }

        let mut aliases = HashMap::new();
        for mut identifiers in by_bucket.into_values() {
            identifiers.sort();
            let canonical = identifiers[0];
            for alias in &identifiers[1..] {
                aliases.insert((*alias).clone(), canonical.clone());
            }
        }
        aliases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryArtifact, MockUnversionedBucket};
    use crate::unversioned::UnversionedBucketPair;
    use blobsafe_core::{ExecutionStrategy, FixedClock};

    struct Fixture {
        pairs: HashMap<String, Arc<dyn BucketPair>>,
        live: HashMap<String, Arc<MockUnversionedBucket>>,
        backup: HashMap<String, Arc<MockUnversionedBucket>>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                pairs: HashMap::new(),
                live: HashMap::new(),
                backup: HashMap::new(),
            }
        }

        fn pair(mut self, identifier: &str, live: MockUnversionedBucket, backup: MockUnversionedBucket) -> Self {
            let live = Arc::new(live);
            let backup = Arc::new(backup);
            self.pairs.insert(
                identifier.to_string(),
                Arc::new(UnversionedBucketPair::new(
                    live.clone(),
                    backup.clone(),
                    ExecutionStrategy::Serial,
                )),
            );
            self.live.insert(identifier.to_string(), live);
            self.backup.insert(identifier.to_string(), backup);
            self
        }

        fn backuper(&self, artifact: Arc<MemoryArtifact<BackupBucketAddress>>) -> Backuper {
            Backuper::new(
                self.pairs.clone(),
                artifact,
                Arc::new(FixedClock::new("2024_01_31_13_45_00")),
            )
        }
    }

    #[tokio::test]
    async fn empty_source_is_recorded_as_empty_backup() {
        let fixture = Fixture::new()
            .pair(
                "droplets",
                MockUnversionedBucket::new("live-droplets", "r").with_files("", &["one", "two"]),
                MockUnversionedBucket::new("backup-droplets", "r"),
            )
            .pair(
                "packages",
                MockUnversionedBucket::new("live-packages", "r"),
                MockUnversionedBucket::new("backup-packages", "r"),
            );
        let artifact = Arc::new(MemoryArtifact::<BackupBucketAddress>::empty());

        let addresses = fixture.backuper(artifact.clone()).run().await.unwrap();

        assert!(addresses["packages"].empty_backup);
        assert!(fixture.backup["packages"].copies().is_empty());

        assert!(!addresses["droplets"].empty_backup);
        assert_eq!(addresses["droplets"].path, "2024_01_31_13_45_00/droplets");
        assert_eq!(addresses["packages"].path, "2024_01_31_13_45_00/packages");
        assert_eq!(fixture.backup["droplets"].copies().len(), 2);

        assert_eq!(artifact.saves(), 1);
        assert_eq!(artifact.saved(), Some(addresses));
    }

    #[tokio::test]
    async fn failed_pair_saves_nothing() {
        let mut failing_backup = MockUnversionedBucket::new("backup-packages", "r");
        failing_backup.fail_copy_of = Some("x".to_string());
        let fixture = Fixture::new()
            .pair(
                "droplets",
                MockUnversionedBucket::new("live-droplets", "r").with_files("", &["one"]),
                MockUnversionedBucket::new("backup-droplets", "r"),
            )
            .pair(
                "packages",
                MockUnversionedBucket::new("live-packages", "r").with_files("", &["x"]),
                failing_backup,
            );
        let artifact = Arc::new(MemoryArtifact::<BackupBucketAddress>::empty());

        let err = fixture.backuper(artifact.clone()).run().await.unwrap_err();

        assert!(err.to_string().contains("failed to backup bucket live-packages"), "{}", err);
        assert_eq!(artifact.saves(), 0);
    }

    #[tokio::test]
    async fn live_and_backup_bucket_must_differ() {
        let fixture = Fixture::new().pair(
            "droplets",
            MockUnversionedBucket::new("same", "r").with_files("", &["one"]),
            MockUnversionedBucket::new("same", "r"),
        );
        let artifact = Arc::new(MemoryArtifact::<BackupBucketAddress>::empty());

        let err = fixture.backuper(artifact.clone()).run().await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to backup bucket 'droplets': live bucket and backup bucket cannot be the same"
        );
        assert!(fixture.backup["droplets"].copies().is_empty());
        assert_eq!(artifact.saves(), 0);
    }

    #[tokio::test]
    async fn backup_bucket_cannot_be_another_live_bucket() {
        let fixture = Fixture::new()
            .pair(
                "droplets",
                MockUnversionedBucket::new("live-droplets", "r").with_files("", &["one"]),
                MockUnversionedBucket::new("backup-droplets", "r"),
            )
            .pair(
                "packages",
                MockUnversionedBucket::new("live-packages", "r").with_files("", &["two"]),
                MockUnversionedBucket::new("live-droplets", "r"),
            );
        let artifact = Arc::new(MemoryArtifact::<BackupBucketAddress>::empty());

        let err = fixture.backuper(artifact.clone()).run().await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "'packages' backup bucket can not be the same as 'droplets' live bucket"
        );
        assert!(fixture.backup["droplets"].copies().is_empty());
        assert_eq!(artifact.saves(), 0);
    }

    #[tokio::test]
    async fn shared_live_bucket_is_copied_once() {
        let fixture = Fixture::new()
            .pair(
                "bucket2",
                MockUnversionedBucket::new("shared-live", "r").with_files("", &["one"]),
                MockUnversionedBucket::new("backup-2", "r"),
            )
            .pair(
                "bucket1",
                MockUnversionedBucket::new("shared-live", "r").with_files("", &["one"]),
                MockUnversionedBucket::new("backup-1", "r"),
            );
        let artifact = Arc::new(MemoryArtifact::<BackupBucketAddress>::empty());

        let addresses = fixture.backuper(artifact).run().await.unwrap();

        assert_eq!(addresses["bucket1"].path, "2024_01_31_13_45_00/bucket1");
        assert_eq!(addresses["bucket1"].same_bucket_as, None);
        assert_eq!(addresses["bucket2"], BackupBucketAddress::alias_of("bucket1"));
        assert_eq!(fixture.backup["bucket1"].copies().len(), 1);
        assert!(fixture.backup["bucket2"].copies().is_empty());
    }
}
