//! Turns bucket configuration into engine collaborators.
//!
//! Every function validates and builds all entries before returning; a
//! failure names the identifier of the bad entry and nothing is returned for
//! the others.

use std::collections::HashMap;
use std::sync::Arc;

use blobsafe_core::{BucketConfig, BucketSpec, ExecutionStrategy, UnversionedBucketConfig};
use blobsafe_storage::{BucketFactory, UnversionedBucket, VersionedBucket};

use crate::error::{BackupError, BackupResult};
use crate::unversioned::{BackupBucketAddresses, BucketPair, UnversionedBucketPair};

fn sorted_identifiers<T>(configs: &HashMap<String, T>) -> Vec<&String> {
    let mut identifiers: Vec<&String> = configs.keys().collect();
    identifiers.sort();
    identifiers
}

pub async fn build_versioned_buckets(
    configs: &HashMap<String, BucketConfig>,
    factory: &dyn BucketFactory,
) -> BackupResult<HashMap<String, Arc<dyn VersionedBucket>>> {
    let mut buckets = HashMap::with_capacity(configs.len());
    for identifier in sorted_identifiers(configs) {
        let config = &configs[identifier];
        config.validate(identifier)?;

        let bucket = factory
            .versioned_bucket(&config.spec())
            .await
            .map_err(|e| BackupError::bucket_setup(identifier, e))?;

        tracing::debug!(identifier = %identifier, bucket = %bucket.name(), "Versioned bucket ready");
        buckets.insert(identifier.clone(), bucket);
    }
    Ok(buckets)
}

/// Pairs for a backup run, using the backup bucket named in each config entry.
pub async fn build_bucket_pairs(
    configs: &HashMap<String, UnversionedBucketConfig>,
    factory: &dyn BucketFactory,
    strategy: ExecutionStrategy,
) -> BackupResult<HashMap<String, Arc<dyn BucketPair>>> {
    let mut pairs = HashMap::with_capacity(configs.len());
    for identifier in sorted_identifiers(configs) {
        let config = &configs[identifier];
        config.validate(identifier)?;

        let pair = build_pair(identifier, config, &config.backup_spec(), factory, strategy).await?;
        pairs.insert(identifier.clone(), pair);
    }
    Ok(pairs)
}

/// Pairs for a restore run.
///
/// The backup bucket of each pair is the one recorded in `addresses`, so a
/// restore still reads from where the backup was written after the config's
/// backup bucket changes. Entries without a recorded bucket, such as those
/// sharing another identifier's bucket, fall back to the configured one.
pub async fn build_restore_bucket_pairs(
    configs: &HashMap<String, UnversionedBucketConfig>,
    addresses: &BackupBucketAddresses,
    factory: &dyn BucketFactory,
    strategy: ExecutionStrategy,
) -> BackupResult<HashMap<String, Arc<dyn BucketPair>>> {
    crate::unversioned::check_identifiers(configs, addresses)?;

    let mut pairs = HashMap::with_capacity(configs.len());
    for identifier in sorted_identifiers(configs) {
        let config = &configs[identifier];
        config.validate(identifier)?;

        let backup_spec = match addresses.get(identifier) {
            Some(address) if !address.bucket_name.is_empty() => config
                .live
                .spec_for(&address.bucket_name, &address.bucket_region),
            _ => config.backup_spec(),
        };

        let pair = build_pair(identifier, config, &backup_spec, factory, strategy).await?;
        pairs.insert(identifier.clone(), pair);
    }
    Ok(pairs)
}

async fn build_pair(
    identifier: &str,
    config: &UnversionedBucketConfig,
    backup_spec: &BucketSpec,
    factory: &dyn BucketFactory,
    strategy: ExecutionStrategy,
) -> BackupResult<Arc<dyn BucketPair>> {
    let live = unversioned_bucket(identifier, &config.live_spec(), factory).await?;
    let backup = unversioned_bucket(identifier, backup_spec, factory).await?;

    tracing::debug!(
        identifier = %identifier,
        bucket = %live.name(),
        backup_bucket = %backup.name(),
        "Bucket pair ready"
    );
    Ok(Arc::new(UnversionedBucketPair::new(live, backup, strategy)))
}

/// Build a handle and make sure the bucket is not versioned.
async fn unversioned_bucket(
    identifier: &str,
    spec: &BucketSpec,
    factory: &dyn BucketFactory,
) -> BackupResult<Arc<dyn UnversionedBucket>> {
    let bucket = factory
        .unversioned_bucket(spec)
        .await
        .map_err(|e| BackupError::bucket_setup(identifier, e))?;

    let versioned = bucket
        .is_versioned()
        .await
        .map_err(|e| BackupError::bucket_setup(identifier, e))?;
    if versioned {
        return Err(BackupError::BucketIsVersioned(spec.name.clone()));
    }

    Ok(bucket)
}
