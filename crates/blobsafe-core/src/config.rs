//! Configuration module
//!
//! Bucket configuration is a JSON document keyed by the user-chosen bucket
//! identifier. The versioned engine reads a map of [`BucketConfig`]; the
//! unversioned engine reads a map of [`UnversionedBucketConfig`], which adds
//! the dedicated backup bucket.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage_types::{BucketSpec, Credentials};

/// Live bucket configuration for one identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub aws_access_key_id: String,
    #[serde(default)]
    pub aws_secret_access_key: String,
    /// Custom endpoint for S3-compatible providers. Empty means the vendor default.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub use_iam_profile: bool,
    #[serde(default)]
    pub force_path_style: bool,
}

impl BucketConfig {
    pub fn validate(&self, identifier: &str) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid_bucket(identifier, "bucket name is empty"));
        }

        if !self.use_iam_profile {
            if self.aws_access_key_id.is_empty() {
                return Err(ConfigError::invalid_bucket(
                    identifier,
                    "aws_access_key_id is required unless use_iam_profile is set",
                ));
            }
            if self.aws_secret_access_key.is_empty() {
                return Err(ConfigError::invalid_bucket(
                    identifier,
                    "aws_secret_access_key is required unless use_iam_profile is set",
                ));
            }
        }

        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        if self.use_iam_profile {
            Credentials::IamProfile
        } else {
            Credentials::AccessKey {
                id: self.aws_access_key_id.clone(),
                secret: self.aws_secret_access_key.clone(),
            }
        }
    }

    pub fn endpoint(&self) -> Option<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            None
        } else {
            Some(endpoint.to_string())
        }
    }

    /// [`BucketSpec`] for the bucket this entry names.
    pub fn spec(&self) -> BucketSpec {
        self.spec_for(&self.name, &self.region)
    }

    /// [`BucketSpec`] for another bucket reached with the same endpoint and credentials.
    pub fn spec_for(&self, name: &str, region: &str) -> BucketSpec {
        BucketSpec {
            name: name.to_string(),
            region: region.to_string(),
            endpoint: self.endpoint(),
            credentials: self.credentials(),
            force_path_style: self.force_path_style,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupBucketConfig {
    pub name: String,
    #[serde(default)]
    pub region: String,
}

/// Live bucket plus its dedicated backup bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnversionedBucketConfig {
    #[serde(flatten)]
    pub live: BucketConfig,
    pub backup: BackupBucketConfig,
}

impl UnversionedBucketConfig {
    pub fn validate(&self, identifier: &str) -> Result<(), ConfigError> {
        self.live.validate(identifier)?;

        if self.backup.name.trim().is_empty() {
            return Err(ConfigError::invalid_bucket(
                identifier,
                "backup bucket name is empty",
            ));
        }

        Ok(())
    }

    pub fn live_spec(&self) -> BucketSpec {
        self.live.spec()
    }

    pub fn backup_spec(&self) -> BucketSpec {
        self.live.spec_for(&self.backup.name, &self.backup.region)
    }
}

/// Read a bucket configuration file keyed by bucket identifier.
pub fn load_bucket_configs<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<HashMap<String, T>, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.display().to_string(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::InvalidFormat {
        path: path.display().to_string(),
        source,
    })
}
