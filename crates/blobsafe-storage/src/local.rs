use crate::factory::BucketFactory;
use crate::traits::{StorageError, StorageResult, UnversionedBucket, VersionedBucket};
use async_trait::async_trait;
use blobsafe_core::{blobpath, BucketSpec};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Region reported by filesystem buckets.
pub const LOCAL_REGION: &str = "local";

/// Unversioned bucket backed by a directory under a shared root.
///
/// Each bucket is the directory `root/<name>`, so copies between buckets of the
/// same root are plain file copies. Versioning is never enabled.
#[derive(Clone, Debug)]
pub struct LocalBucket {
    root: PathBuf,
    name: String,
    bucket_path: PathBuf,
}

impl LocalBucket {
    /// Open the bucket `name` under `root`, creating its directory if needed.
    pub async fn new(root: impl Into<PathBuf>, name: &str) -> StorageResult<Self> {
        let root = root.into();
        let bucket_path = bucket_dir(&root, name)?;

        fs::create_dir_all(&bucket_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create bucket directory {}: {}",
                bucket_path.display(),
                e
            ))
        })?;

        Ok(LocalBucket {
            root,
            name: name.to_string(),
            bucket_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.bucket_path
    }

    async fn walk(&self, dir: PathBuf) -> StorageResult<Vec<String>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.clone()];

        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current).await.map_err(|e| self.list_failed(e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| self.list_failed(e))? {
                let file_type = entry.file_type().await.map_err(|e| self.list_failed(e))?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&dir) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join(blobpath::DELIMITER);
                    files.push(key);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn list_failed(&self, e: std::io::Error) -> StorageError {
        StorageError::ListFailed {
            bucket: self.name.clone(),
            reason: e.to_string(),
        }
    }
}

/// Join a key under a base directory, rejecting keys that could escape it.
fn join_checked(base: &Path, key: &str) -> StorageResult<PathBuf> {
    let escapes = Path::new(key).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(StorageError::InvalidKey(format!(
            "'{}' contains invalid characters",
            key
        )));
    }
    Ok(base.join(key))
}

/// Directory of bucket `name` under `root`.
///
/// Names are a single path segment, so one bucket never nests inside another.
fn bucket_dir(root: &Path, name: &str) -> StorageResult<PathBuf> {
    let single_segment = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(blobpath::DELIMITER)
        && !name.contains('\\');
    if !single_segment {
        return Err(StorageError::ConfigError(format!(
            "invalid bucket name '{}': must be a single non-empty path segment",
            name
        )));
    }
    join_checked(root, name)
}

#[async_trait]
impl UnversionedBucket for LocalBucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &str {
        LOCAL_REGION
    }

    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = blobpath::trim_trailing_delimiter(prefix);
        let dir = if prefix.is_empty() {
            self.bucket_path.clone()
        } else {
            join_checked(&self.bucket_path, prefix)?
        };

        if !fs::try_exists(&dir).await.map_err(|e| self.list_failed(e))? {
            return Ok(Vec::new());
        }

        let files = self.walk(dir).await?;
        tracing::debug!(
            bucket = %self.name,
            prefix = %prefix,
            count = files.len(),
            "Listed local bucket"
        );
        Ok(files)
    }

    async fn copy_object(
        &self,
        key: &str,
        origin_prefix: &str,
        destination_prefix: &str,
        origin_bucket_name: &str,
        _origin_bucket_region: &str,
    ) -> StorageResult<()> {
        let origin_bucket = bucket_dir(&self.root, origin_bucket_name)?;
        let source = join_checked(&origin_bucket, &blobpath::join(origin_prefix, key))?;
        let destination_key = blobpath::join(destination_prefix, key);
        let destination = join_checked(&self.bucket_path, &destination_key)?;

        let copy_failed = |e: std::io::Error| StorageError::CopyFailed {
            bucket: self.name.clone(),
            key: destination_key.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(copy_failed)?;
        }
        let bytes = fs::copy(&source, &destination).await.map_err(copy_failed)?;

        tracing::debug!(
            origin_bucket = %origin_bucket_name,
            source = %source.display(),
            destination = %destination.display(),
            size_bytes = bytes,
            "Local copy successful"
        );
        Ok(())
    }

    async fn is_versioned(&self) -> StorageResult<bool> {
        Ok(false)
    }
}

/// Builds [`LocalBucket`] handles under one root directory.
#[derive(Clone, Debug)]
pub struct LocalBucketFactory {
    root: PathBuf,
}

impl LocalBucketFactory {
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(LocalBucketFactory { root })
    }
}

#[async_trait]
impl BucketFactory for LocalBucketFactory {
    async fn versioned_bucket(&self, spec: &BucketSpec) -> StorageResult<Arc<dyn VersionedBucket>> {
        Err(StorageError::ConfigError(format!(
            "local storage does not support versioned buckets (bucket {})",
            spec.name
        )))
    }

    async fn unversioned_bucket(
        &self,
        spec: &BucketSpec,
    ) -> StorageResult<Arc<dyn UnversionedBucket>> {
        let bucket = LocalBucket::new(&self.root, &spec.name).await?;
        Ok(Arc::new(bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(bucket: &LocalBucket, key: &str, contents: &str) {
        let path = bucket.path().join(key);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, contents).await.unwrap();
    }

    #[tokio::test]
    async fn list_files_returns_keys_relative_to_prefix() {
        let root = TempDir::new().unwrap();
        let bucket = LocalBucket::new(root.path(), "live").await.unwrap();
        write_file(&bucket, "a.txt", "a").await;
        write_file(&bucket, "nested/b.txt", "b").await;
        write_file(&bucket, "nested/deeper/c.txt", "c").await;

        let all = bucket.list_files("").await.unwrap();
        assert_eq!(all, vec!["a.txt", "nested/b.txt", "nested/deeper/c.txt"]);

        let nested = bucket.list_files("nested").await.unwrap();
        assert_eq!(nested, vec!["b.txt", "deeper/c.txt"]);

        let nested_with_slash = bucket.list_files("nested/").await.unwrap();
        assert_eq!(nested_with_slash, nested);
    }

    #[tokio::test]
    async fn list_files_of_missing_prefix_is_empty() {
        let root = TempDir::new().unwrap();
        let bucket = LocalBucket::new(root.path(), "live").await.unwrap();

        assert!(bucket.list_files("2024_01_01_00_00_00/live").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn copy_object_moves_between_prefixes_and_buckets() {
        let root = TempDir::new().unwrap();
        let live = LocalBucket::new(root.path(), "live").await.unwrap();
        let backup = LocalBucket::new(root.path(), "backup").await.unwrap();
        write_file(&live, "dir/file.txt", "contents").await;

        backup
            .copy_object("dir/file.txt", "", "ts/droplets", "live", LOCAL_REGION)
            .await
            .unwrap();

        let copied = fs::read_to_string(backup.path().join("ts/droplets/dir/file.txt"))
            .await
            .unwrap();
        assert_eq!(copied, "contents");
        assert_eq!(
            backup.list_files("ts/droplets").await.unwrap(),
            vec!["dir/file.txt"]
        );
    }

    #[tokio::test]
    async fn copy_object_reports_missing_source() {
        let root = TempDir::new().unwrap();
        let backup = LocalBucket::new(root.path(), "backup").await.unwrap();
        LocalBucket::new(root.path(), "live").await.unwrap();

        let err = backup
            .copy_object("missing.txt", "", "ts", "live", LOCAL_REGION)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CopyFailed { ref key, .. } if key == "ts/missing.txt"));
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let root = TempDir::new().unwrap();
        let bucket = LocalBucket::new(root.path(), "live").await.unwrap();

        assert!(matches!(
            bucket.list_files("../other").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            bucket.copy_object("x", "", "", "../etc", LOCAL_REGION).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            bucket.list_files("/abs").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn keys_with_consecutive_dots_are_copied() {
        let root = TempDir::new().unwrap();
        let live = LocalBucket::new(root.path(), "live").await.unwrap();
        let backup = LocalBucket::new(root.path(), "backup").await.unwrap();
        write_file(&live, "reports/report..final.txt", "final").await;
        write_file(&live, "...", "dots").await;

        assert_eq!(
            live.list_files("").await.unwrap(),
            vec!["...", "reports/report..final.txt"]
        );
        for key in live.list_files("").await.unwrap() {
            backup
                .copy_object(&key, "", "ts/droplets", "live", LOCAL_REGION)
                .await
                .unwrap();
        }

        assert_eq!(
            backup.list_files("ts/droplets").await.unwrap(),
            vec!["...", "reports/report..final.txt"]
        );
    }

    #[tokio::test]
    async fn bucket_names_must_be_a_single_segment() {
        let root = TempDir::new().unwrap();

        for name in ["live/backups", "/abs", "..", ""] {
            assert!(
                matches!(
                    LocalBucket::new(root.path(), name).await,
                    Err(StorageError::ConfigError(_))
                ),
                "{}",
                name
            );
        }
        assert!(!root.path().join("live").exists());

        let backup = LocalBucket::new(root.path(), "backup").await.unwrap();
        assert!(matches!(
            backup.copy_object("a.txt", "", "ts", "live/nested", LOCAL_REGION).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_prefix_fails_the_listing() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let bucket = LocalBucket::new(root.path(), "live").await.unwrap();
        write_file(&bucket, "locked/inner/a.txt", "a").await;
        let locked = bucket.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass permission checks.
        let privileged = std::fs::metadata(locked.join("inner")).is_ok();
        let result = bucket.list_files("locked/inner").await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !privileged {
            assert!(matches!(result, Err(StorageError::ListFailed { .. })));
        }
    }

    #[tokio::test]
    async fn local_buckets_are_never_versioned() {
        let root = TempDir::new().unwrap();
        let bucket = LocalBucket::new(root.path(), "live").await.unwrap();
        assert!(!bucket.is_versioned().await.unwrap());
    }
}
