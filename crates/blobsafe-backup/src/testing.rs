//! In-memory collaborators for engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use blobsafe_storage::{StorageError, StorageResult, UnversionedBucket, Version, VersionedBucket};

use crate::artifact::Artifact;
use crate::error::BackupResult;

/// Artifact held in memory that counts saves.
pub struct MemoryArtifact<T> {
    records: Mutex<Option<HashMap<String, T>>>,
    saves: AtomicUsize,
}

impl<T: Clone> MemoryArtifact<T> {
    pub fn empty() -> Self {
        MemoryArtifact {
            records: Mutex::new(None),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn with(records: HashMap<String, T>) -> Self {
        MemoryArtifact {
            records: Mutex::new(Some(records)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Option<HashMap<String, T>> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> Artifact<T> for MemoryArtifact<T> {
    async fn save(&self, records: &HashMap<String, T>) -> BackupResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.records.lock().unwrap() = Some(records.clone());
        Ok(())
    }

    async fn load(&self) -> BackupResult<HashMap<String, T>> {
        Ok(self.records.lock().unwrap().clone().unwrap_or_default())
    }
}

/// A `copy_version` call: (key, version id, origin name, origin region).
pub type VersionCopy = (String, String, String, String);

pub struct MockVersionedBucket {
    pub name: String,
    pub region: String,
    pub versions: Vec<Version>,
    pub versioned: bool,
    pub fail_listing: bool,
    pub fail_copy_of: Option<String>,
    pub copies: Mutex<Vec<VersionCopy>>,
}

impl MockVersionedBucket {
    pub fn new(name: &str, region: &str) -> Self {
        MockVersionedBucket {
            name: name.to_string(),
            region: region.to_string(),
            versions: Vec::new(),
            versioned: true,
            fail_listing: false,
            fail_copy_of: None,
            copies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_versions(mut self, versions: &[(&str, &str, bool)]) -> Self {
        self.versions = versions
            .iter()
            .map(|(id, key, is_latest)| Version {
                key: key.to_string(),
                id: id.to_string(),
                is_latest: *is_latest,
            })
            .collect();
        self
    }

    pub fn copies(&self) -> Vec<VersionCopy> {
        self.copies.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionedBucket for MockVersionedBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn list_versions(&self) -> StorageResult<Vec<Version>> {
        if self.fail_listing {
            return Err(StorageError::ListFailed {
                bucket: self.name.clone(),
                reason: "listing unavailable".to_string(),
            });
        }
        Ok(self.versions.clone())
    }

    async fn copy_version(
        &self,
        blob_key: &str,
        version_id: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()> {
        if self.fail_copy_of.as_deref() == Some(blob_key) {
            return Err(StorageError::CopyFailed {
                bucket: self.name.clone(),
                key: blob_key.to_string(),
                reason: "copy rejected".to_string(),
            });
        }
        self.copies.lock().unwrap().push((
            blob_key.to_string(),
            version_id.to_string(),
            origin_bucket_name.to_string(),
            origin_bucket_region.to_string(),
        ));
        Ok(())
    }

    async fn check_if_versioned(&self) -> StorageResult<()> {
        if self.versioned {
            Ok(())
        } else {
            Err(StorageError::NotVersioned(self.name.clone()))
        }
    }
}

/// A `copy_object` call: (key, origin prefix, destination prefix, origin name, origin region).
pub type ObjectCopy = (String, String, String, String, String);

pub struct MockUnversionedBucket {
    pub name: String,
    pub region: String,
    /// Keys returned by `list_files`, by prefix.
    pub files: HashMap<String, Vec<String>>,
    pub versioned: bool,
    pub fail_copy_of: Option<String>,
    pub copies: Mutex<Vec<ObjectCopy>>,
}

impl MockUnversionedBucket {
    pub fn new(name: &str, region: &str) -> Self {
        MockUnversionedBucket {
            name: name.to_string(),
            region: region.to_string(),
            files: HashMap::new(),
            versioned: false,
            fail_copy_of: None,
            copies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_files(mut self, prefix: &str, keys: &[&str]) -> Self {
        self.files.insert(
            prefix.to_string(),
            keys.iter().map(|k| k.to_string()).collect(),
        );
        self
    }

    pub fn copies(&self) -> Vec<ObjectCopy> {
        let mut copies = self.copies.lock().unwrap().clone();
        copies.sort();
        copies
    }
}

#[async_trait]
impl UnversionedBucket for MockUnversionedBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self.files.get(prefix).cloned().unwrap_or_default())
    }

    async fn copy_object(
        &self,
        key: &str,
        origin_prefix: &str,
        destination_prefix: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()> {
        if self.fail_copy_of.as_deref() == Some(key) {
            return Err(StorageError::CopyFailed {
                bucket: self.name.clone(),
                key: key.to_string(),
                reason: "copy rejected".to_string(),
            });
        }
        self.copies.lock().unwrap().push((
            key.to_string(),
            origin_prefix.to_string(),
            destination_prefix.to_string(),
            origin_bucket_name.to_string(),
            origin_bucket_region.to_string(),
        ));
        Ok(())
    }

    async fn is_versioned(&self) -> StorageResult<bool> {
        Ok(self.versioned)
    }
}
