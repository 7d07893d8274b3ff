use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use super::{BackupBucketAddress, BackupBucketAddresses, BucketPair};
use crate::artifact::Artifact;
use crate::error::{BackupError, BackupResult};

/// Copies backed up objects back into the configured live buckets.
pub struct Restorer {
    pairs: HashMap<String, Arc<dyn BucketPair>>,
    artifact: Arc<dyn Artifact<BackupBucketAddress>>,
}

impl Restorer {
    pub fn new(
        pairs: HashMap<String, Arc<dyn BucketPair>>,
        artifact: Arc<dyn Artifact<BackupBucketAddress>>,
    ) -> Self {
        Restorer { pairs, artifact }
    }

    pub async fn run(&self) -> BackupResult<()> {
        let addresses = self.artifact.load().await?;
        self.restore_from(&addresses).await
    }

    /// Restore every configured pair from `addresses`.
    ///
    /// Both sides are checked for identifiers the other side lacks before
    /// anything is copied. Pairs recorded as empty, and identifiers recorded
    /// as sharing another identifier's bucket, are skipped.
    pub async fn restore_from(&self, addresses: &BackupBucketAddresses) -> BackupResult<()> {
        let start = Instant::now();
        check_identifiers(&self.pairs, addresses)?;

        let mut identifiers: Vec<&String> = self.pairs.keys().collect();
        identifiers.sort();

        for identifier in identifiers {
            let address = addresses
                .get(identifier)
                .ok_or_else(|| BackupError::AddressMissing(identifier.clone()))?;

            if let Some(canonical) = &address.same_bucket_as {
                match addresses.get(canonical) {
                    Some(target) if !target.is_alias() => {
                        tracing::info!(
                            identifier = %identifier,
                            same_bucket_as = %canonical,
                            "Skipping bucket restored under another identifier"
                        );
                        continue;
                    }
                    _ => {
                        return Err(BackupError::DanglingAlias {
                            identifier: identifier.clone(),
                            canonical: canonical.clone(),
                        })
                    }
                }
            }

            if address.empty_backup {
                tracing::info!(
                    identifier = %identifier,
                    "Skipping bucket that was empty at backup time"
                );
                continue;
            }

            self.pairs[identifier].restore(&address.path).await?;
        }

        tracing::info!(
            buckets = self.pairs.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Unversioned restore complete"
        );
        Ok(())
    }
}

/// Every artifact identifier must be configured and every configured
/// identifier must be in the artifact.
pub(crate) fn check_identifiers<P>(
    configured: &HashMap<String, P>,
    addresses: &BackupBucketAddresses,
) -> BackupResult<()> {
    let mut recorded: Vec<&String> = addresses.keys().collect();
    recorded.sort();
    if let Some(orphan) = recorded.into_iter().find(|id| !configured.contains_key(*id)) {
        return Err(BackupError::AddressNotConfigured(orphan.clone()));
    }

    let mut expected: Vec<&String> = configured.keys().collect();
    expected.sort();
    if let Some(missing) = expected.into_iter().find(|id| !addresses.contains_key(*id)) {
        return Err(BackupError::AddressMissing(missing.clone()));
    }

    Ok(())
}
