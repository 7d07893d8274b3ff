//! Error types for backup and restore runs
//!
//! Every failure of a run maps to one [`BackupError`]. Errors describe
//! themselves through [`BackupError::category`] and [`BackupError::log_level`]
//! so the caller can report configuration mistakes differently from
//! transient vendor failures.

use std::io;

use blobsafe_core::{ConfigError, LogLevel};
use blobsafe_storage::StorageError;

pub type BackupResult<T> = Result<T, BackupError>;

/// Broad class of a run failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad credentials, bad bucket names, identifiers that do not match.
    Configuration,
    /// The stored data cannot be restored as recorded.
    Consistency,
    /// A vendor or filesystem call failed. Re-running may succeed.
    Transient,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to set up bucket '{identifier}': {source}")]
    BucketSetup {
        identifier: String,
        #[source]
        source: StorageError,
    },

    #[error("bucket '{identifier}': {source}")]
    Storage {
        identifier: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to retrieve versions; bucket '{0}' has `null` version ids")]
    NullVersionId(String),

    #[error("no entry found in restore config for bucket: {0}")]
    SnapshotNotConfigured(String),

    #[error("no entry found in backup artifact for bucket: {0}")]
    SnapshotMissing(String),

    #[error("bucket {0} is not mentioned in the restore config but is present in the artifact")]
    AddressNotConfigured(String),

    #[error("cannot restore bucket {0}, not found in backup artifact")]
    AddressMissing(String),

    #[error("bucket {identifier} shares its bucket with {canonical}, which has no backup in the artifact")]
    DanglingAlias {
        identifier: String,
        canonical: String,
    },

    #[error("no files found in {location} in bucket {bucket} to restore")]
    EmptyBackupLocation { location: String, bucket: String },

    #[error("failed to backup bucket '{0}': live bucket and backup bucket cannot be the same")]
    SameLiveAndBackupBucket(String),

    #[error("'{backup_identifier}' backup bucket can not be the same as '{live_identifier}' live bucket")]
    BackupBucketIsLiveBucket {
        backup_identifier: String,
        live_identifier: String,
    },

    #[error("bucket {0} is versioned")]
    BucketIsVersioned(String),

    /// One or more object copies of a batch failed, one line per object.
    #[error("{context}: {details}")]
    CopyFailed { context: String, details: String },

    #[error("could not write backup file: {0}")]
    ArtifactWrite(#[source] io::Error),

    #[error("could not read backup file: {0}")]
    ArtifactRead(#[source] io::Error),

    #[error("backup file has an invalid format: {0}")]
    ArtifactFormat(#[source] serde_json::Error),
}

impl BackupError {
    pub fn storage(identifier: &str, source: StorageError) -> Self {
        BackupError::Storage {
            identifier: identifier.to_string(),
            source,
        }
    }

    pub fn bucket_setup(identifier: &str, source: StorageError) -> Self {
        BackupError::BucketSetup {
            identifier: identifier.to_string(),
            source,
        }
    }

    /// Aggregate the failures of one copy batch.
    pub fn copy_failed(context: impl Into<String>, errors: Vec<StorageError>) -> Self {
        let details = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        BackupError::CopyFailed {
            context: context.into(),
            details,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        error_static_metadata(self).0
    }

    /// Machine-readable error code (e.g., "NULL_VERSION_ID")
    pub fn error_code(&self) -> &'static str {
        error_static_metadata(self).1
    }

    pub fn log_level(&self) -> LogLevel {
        error_static_metadata(self).2
    }

    /// Suggested action for the operator
    pub fn suggested_action(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Fix the bucket configuration and run again",
            ErrorCategory::Consistency => "Inspect the buckets and the backup file before running again",
            ErrorCategory::Transient => "Fix the cause and run again; copies are safe to repeat",
        }
    }
}

fn storage_category(err: &StorageError) -> ErrorCategory {
    match err {
        StorageError::NotVersioned(_) => ErrorCategory::Consistency,
        StorageError::InvalidKey(_) | StorageError::ConfigError(_) => ErrorCategory::Configuration,
        StorageError::ListFailed { .. }
        | StorageError::CopyFailed { .. }
        | StorageError::VersioningCheckFailed { .. }
        | StorageError::BackendError(_)
        | StorageError::IoError(_) => ErrorCategory::Transient,
    }
}

/// Static metadata for each variant: (category, error_code, log_level).
fn error_static_metadata(err: &BackupError) -> (ErrorCategory, &'static str, LogLevel) {
    match err {
        BackupError::Config(_) => (
            ErrorCategory::Configuration,
            "CONFIG_ERROR",
            LogLevel::Error,
        ),
        BackupError::BucketSetup { .. } => (
            ErrorCategory::Configuration,
            "BUCKET_SETUP_FAILED",
            LogLevel::Error,
        ),
        BackupError::Storage { source, .. } => {
            let category = storage_category(source);
            let level = if category == ErrorCategory::Transient {
                LogLevel::Warn
            } else {
                LogLevel::Error
            };
            (category, "STORAGE_ERROR", level)
        }
        BackupError::NullVersionId(_) => (
            ErrorCategory::Consistency,
            "NULL_VERSION_ID",
            LogLevel::Error,
        ),
        BackupError::SnapshotNotConfigured(_) | BackupError::AddressNotConfigured(_) => (
            ErrorCategory::Configuration,
            "IDENTIFIER_NOT_CONFIGURED",
            LogLevel::Error,
        ),
        BackupError::SnapshotMissing(_) | BackupError::AddressMissing(_) => (
            ErrorCategory::Consistency,
            "IDENTIFIER_NOT_IN_ARTIFACT",
            LogLevel::Error,
        ),
        BackupError::DanglingAlias { .. } => (
            ErrorCategory::Consistency,
            "DANGLING_ALIAS",
            LogLevel::Error,
        ),
        BackupError::EmptyBackupLocation { .. } => (
            ErrorCategory::Consistency,
            "EMPTY_BACKUP_LOCATION",
            LogLevel::Error,
        ),
        BackupError::SameLiveAndBackupBucket(_) | BackupError::BackupBucketIsLiveBucket { .. } => (
            ErrorCategory::Configuration,
            "INVALID_BUCKET_PAIR",
            LogLevel::Error,
        ),
        BackupError::BucketIsVersioned(_) => (
            ErrorCategory::Configuration,
            "BUCKET_IS_VERSIONED",
            LogLevel::Error,
        ),
        BackupError::CopyFailed { .. } => (
            ErrorCategory::Transient,
            "COPY_FAILED",
            LogLevel::Warn,
        ),
        BackupError::ArtifactWrite(_) | BackupError::ArtifactRead(_) => (
            ErrorCategory::Transient,
            "ARTIFACT_IO_FAILED",
            LogLevel::Warn,
        ),
        BackupError::ArtifactFormat(_) => (
            ErrorCategory::Consistency,
            "ARTIFACT_INVALID_FORMAT",
            LogLevel::Error,
        ),
    }
}
