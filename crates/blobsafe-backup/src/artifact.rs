//! Persisted backup records
//!
//! A backup run writes one artifact: a JSON object whose keys are bucket
//! identifiers and whose values are the per-bucket records of the engine that
//! produced it. Restore reads it back.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use crate::error::{BackupError, BackupResult};

/// Storage for the records of one engine family.
#[async_trait]
pub trait Artifact<T>: Send + Sync {
    async fn save(&self, records: &HashMap<String, T>) -> BackupResult<()>;

    async fn load(&self) -> BackupResult<HashMap<String, T>>;
}

/// Artifact stored as a JSON file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileArtifact<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

impl<T> FileArtifact<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileArtifact {
            path: path.into(),
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<T> Artifact<T> for FileArtifact<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    async fn save(&self, records: &HashMap<String, T>) -> BackupResult<()> {
        // Sorted keys keep the file stable between runs.
        let sorted: BTreeMap<&String, &T> = records.iter().collect();
        let contents = serde_json::to_string_pretty(&sorted)
            .map_err(|e| BackupError::ArtifactWrite(io::Error::from(e)))?;

        fs::write(&self.path, contents)
            .await
            .map_err(BackupError::ArtifactWrite)?;

        tracing::info!(
            path = %self.path.display(),
            buckets = records.len(),
            "Backup file written"
        );
        Ok(())
    }

    async fn load(&self) -> BackupResult<HashMap<String, T>> {
        let contents = fs::read_to_string(&self.path)
            .await
            .map_err(BackupError::ArtifactRead)?;

        let records: HashMap<String, T> =
            serde_json::from_str(&contents).map_err(BackupError::ArtifactFormat)?;

        tracing::debug!(
            path = %self.path.display(),
            buckets = records.len(),
            "Backup file read"
        );
        Ok(records)
    }
}
