use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::ConfigError;

/// Storage backend types
///
/// This enum defines the vendors a bucket handle can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "local" => Ok(StorageBackend::Local),
            _ => Err(ConfigError::InvalidStorageBackend(s.to_string())),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

/// How a bucket handle authenticates against the vendor.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    AccessKey { id: String, secret: String },
    /// Credentials come from the instance profile of the host.
    IamProfile,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Credentials::AccessKey { id, .. } => f
                .debug_struct("AccessKey")
                .field("id", id)
                .field("secret", &"<redacted>")
                .finish(),
            Credentials::IamProfile => write!(f, "IamProfile"),
        }
    }
}

/// Everything needed to build one bucket handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub name: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers
    pub endpoint: Option<String>,
    pub credentials: Credentials,
    pub force_path_style: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_round_trips_through_strings() {
        for backend in [StorageBackend::S3, StorageBackend::Local] {
            assert_eq!(backend.to_string().parse::<StorageBackend>().unwrap(), backend);
        }
        assert!("nfs".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let credentials = Credentials::AccessKey {
            id: "AKIA123".to_string(),
            secret: "super-secret".to_string(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("AKIA123"));
        assert!(!debug.contains("super-secret"));
    }
}
