use crate::factory::BucketFactory;
use crate::traits::{StorageError, StorageResult, UnversionedBucket, Version, VersionedBucket};
use async_trait::async_trait;
use aws_config::imds::credentials::ImdsCredentialsProvider;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials as AwsCredentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{BucketVersioningStatus, CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use blobsafe_core::{blobpath, BucketSpec, Credentials};
use std::sync::Arc;

/// Objects above this size are copied in parts.
const SINGLE_REQUEST_COPY_LIMIT: i64 = 1024 * 1024 * 1024;
const PART_SIZE: i64 = 100 * 1024 * 1024;

/// S3 bucket implementation
///
/// Serves both capability traits; which one applies depends on whether the
/// bucket has versioning enabled.
#[derive(Clone, Debug)]
pub struct S3Bucket {
    client: Client,
    name: String,
    region: String,
}

impl S3Bucket {
    /// Create a new bucket handle
    ///
    /// With [`Credentials::IamProfile`] the keys are fetched from the instance
    /// metadata service. A custom endpoint targets S3-compatible providers
    /// (e.g., "http://localhost:9000" for MinIO).
    pub async fn new(spec: &BucketSpec) -> StorageResult<Self> {
        if spec.region.trim().is_empty() {
            return Err(StorageError::ConfigError(format!(
                "region is required for S3 bucket {}",
                spec.name
            )));
        }

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(spec.region.clone()))
            .retry_config(retry_config);

        loader = match &spec.credentials {
            Credentials::AccessKey { id, secret } => loader.credentials_provider(
                AwsCredentials::new(id.clone(), secret.clone(), None, None, "blobsafe-config"),
            ),
            Credentials::IamProfile => {
                loader.credentials_provider(ImdsCredentialsProvider::builder().build())
            }
        };

        let sdk_config = loader.load().await;

        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &spec.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint.clone());
        }
        s3_config_builder = s3_config_builder.force_path_style(spec.force_path_style);

        Ok(S3Bucket {
            client: Client::from_conf(s3_config_builder.build()),
            name: spec.name.clone(),
            region: spec.region.clone(),
        })
    }

    /// Client with this bucket's credentials pointed at another region.
    fn client_for_region(&self, region: &str) -> Client {
        if region == self.region || region.is_empty() {
            return self.client.clone();
        }
        let config = self
            .client
            .config()
            .to_builder()
            .region(aws_config::Region::new(region.to_string()))
            .build();
        Client::from_conf(config)
    }

    async fn fetch_versioning_enabled(&self) -> StorageResult<bool> {
        let output = self
            .client
            .get_bucket_versioning()
            .bucket(&self.name)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.name, "Failed to get bucket versioning");
                StorageError::VersioningCheckFailed {
                    bucket: self.name.clone(),
                    reason: DisplayErrorContext(&e).to_string(),
                }
            })?;

        Ok(matches!(
            output.status(),
            Some(BucketVersioningStatus::Enabled)
        ))
    }

    async fn source_size(
        &self,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
        source_key: &str,
        version_id: Option<&str>,
        destination_key: &str,
    ) -> StorageResult<i64> {
        let output = self
            .client_for_region(origin_bucket_region)
            .head_object()
            .bucket(origin_bucket_name)
            .key(source_key)
            .set_version_id(version_id.map(String::from))
            .send()
            .await
            .map_err(|e| self.copy_failed(destination_key, &e))?;

        Ok(output.content_length().unwrap_or(0))
    }

    fn copy_failed<E>(&self, key: &str, e: &E) -> StorageError
    where
        E: std::error::Error,
    {
        StorageError::CopyFailed {
            bucket: self.name.clone(),
            key: key.to_string(),
            reason: DisplayErrorContext(e).to_string(),
        }
    }

    async fn copy(
        &self,
        source_key: &str,
        version_id: Option<&str>,
        destination_key: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let size = self
            .source_size(
                origin_bucket_name,
                origin_bucket_region,
                source_key,
                version_id,
                destination_key,
            )
            .await?;
        let copy_source = copy_source(origin_bucket_name, source_key, version_id);

        if size > SINGLE_REQUEST_COPY_LIMIT {
            self.copy_in_parts(&copy_source, destination_key, size)
                .await?;
        } else {
            self.client
                .copy_object()
                .bucket(&self.name)
                .key(destination_key)
                .copy_source(&copy_source)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.name,
                        copy_source = %copy_source,
                        "S3 copy failed"
                    );
                    self.copy_failed(destination_key, &e)
                })?;
        }

        tracing::debug!(
            origin_bucket = %origin_bucket_name,
            bucket = %self.name,
            source_key = %source_key,
            destination_key = %destination_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );
        Ok(())
    }

    async fn copy_in_parts(
        &self,
        copy_source: &str,
        destination_key: &str,
        size: i64,
    ) -> StorageResult<()> {
        let create_result = self
            .client
            .create_multipart_upload()
            .bucket(&self.name)
            .key(destination_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.name,
                    key = %destination_key,
                    "Failed to create multipart upload"
                );
                self.copy_failed(destination_key, &e)
            })?;

        let upload_id = create_result
            .upload_id()
            .ok_or_else(|| StorageError::CopyFailed {
                bucket: self.name.clone(),
                key: destination_key.to_string(),
                reason: "no upload ID returned from S3".to_string(),
            })?
            .to_string();

        match self
            .upload_parts(copy_source, destination_key, &upload_id, size)
            .await
        {
            Ok(parts) => {
                let completed_parts = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();

                self.client
                    .complete_multipart_upload()
                    .bucket(&self.name)
                    .key(destination_key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed_parts)
                    .send()
                    .await
                    .map_err(|e| {
                        tracing::error!(
                            error = %e,
                            bucket = %self.name,
                            key = %destination_key,
                            "Failed to complete multipart upload"
                        );
                        self.copy_failed(destination_key, &e)
                    })?;
                Ok(())
            }
            Err(err) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.name)
                    .key(destination_key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %abort_err,
                        bucket = %self.name,
                        key = %destination_key,
                        "Failed to abort multipart upload"
                    );
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        copy_source: &str,
        destination_key: &str,
        upload_id: &str,
        size: i64,
    ) -> StorageResult<Vec<CompletedPart>> {
        let mut parts = Vec::new();

        for (index, (first, last)) in part_ranges(size).into_iter().enumerate() {
            let part_number = index as i32 + 1;
            let output = self
                .client
                .upload_part_copy()
                .bucket(&self.name)
                .key(destination_key)
                .upload_id(upload_id)
                .copy_source(copy_source)
                .copy_source_range(format!("bytes={}-{}", first, last))
                .part_number(part_number)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.name,
                        key = %destination_key,
                        part_number = part_number,
                        "Failed to copy part"
                    );
                    self.copy_failed(destination_key, &e)
                })?;

            let etag = output
                .copy_part_result()
                .and_then(|result| result.e_tag())
                .ok_or_else(|| StorageError::CopyFailed {
                    bucket: self.name.clone(),
                    key: destination_key.to_string(),
                    reason: format!("no ETag returned for part {}", part_number),
                })?;

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );
        }

        Ok(parts)
    }
}

/// `bucket/key[?versionId=id]` with the key and version URL-encoded.
fn copy_source(bucket: &str, key: &str, version_id: Option<&str>) -> String {
    let mut source = format!("{}/{}", bucket, urlencoding::encode(key));
    if let Some(version_id) = version_id {
        source.push_str("?versionId=");
        source.push_str(&urlencoding::encode(version_id));
    }
    source
}

/// Inclusive byte ranges covering `size` bytes in `PART_SIZE` chunks.
fn part_ranges(size: i64) -> Vec<(i64, i64)> {
    let mut ranges = Vec::new();
    let mut first = 0;
    while first < size {
        let last = (first + PART_SIZE).min(size) - 1;
        ranges.push((first, last));
        first = last + 1;
    }
    ranges
}

#[async_trait]
impl VersionedBucket for S3Bucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn list_versions(&self) -> StorageResult<Vec<Version>> {
        self.check_if_versioned().await?;

        let mut versions = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut version_id_marker: Option<String> = None;

        loop {
            let output = self
                .client
                .list_object_versions()
                .bucket(&self.name)
                .set_key_marker(key_marker.take())
                .set_version_id_marker(version_id_marker.take())
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, bucket = %self.name, "Failed to list object versions");
                    StorageError::ListFailed {
                        bucket: self.name.clone(),
                        reason: DisplayErrorContext(&e).to_string(),
                    }
                })?;

            for version in output.versions() {
                let (Some(key), Some(id)) = (version.key(), version.version_id()) else {
                    continue;
                };
                versions.push(Version {
                    key: key.to_string(),
                    id: id.to_string(),
                    is_latest: version.is_latest().unwrap_or(false),
                });
            }

            if !output.is_truncated().unwrap_or(false) {
                break;
            }
            key_marker = output.next_key_marker().map(String::from);
            version_id_marker = output.next_version_id_marker().map(String::from);
            if key_marker.is_none() {
                break;
            }
        }

        tracing::debug!(bucket = %self.name, count = versions.len(), "Listed object versions");
        Ok(versions)
    }

    async fn copy_version(
        &self,
        blob_key: &str,
        version_id: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()> {
        self.copy(
            blob_key,
            Some(version_id),
            blob_key,
            origin_bucket_name,
            origin_bucket_region,
        )
        .await
    }

    async fn check_if_versioned(&self) -> StorageResult<()> {
        if self.fetch_versioning_enabled().await? {
            Ok(())
        } else {
            Err(StorageError::NotVersioned(self.name.clone()))
        }
    }
}

#[async_trait]
impl UnversionedBucket for S3Bucket {
    fn name(&self) -> &str {
        &self.name
    }

    fn region(&self) -> &str {
        &self.region
    }

    async fn list_files(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix = blobpath::trim_trailing_delimiter(prefix);
        let list_prefix = if prefix.is_empty() {
            None
        } else {
            Some(format!("{}{}", prefix, blobpath::DELIMITER))
        };

        let mut files = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.name)
                .set_prefix(list_prefix.clone())
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, bucket = %self.name, prefix = %prefix, "Failed to list objects");
                    StorageError::ListFailed {
                        bucket: self.name.clone(),
                        reason: DisplayErrorContext(&e).to_string(),
                    }
                })?;

            files.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(|key| blobpath::trim_prefix(key, prefix).to_string()),
            );

            continuation_token = output.next_continuation_token().map(String::from);
            if !output.is_truncated().unwrap_or(false) || continuation_token.is_none() {
                break;
            }
        }

        Ok(files)
    }

    async fn copy_object(
        &self,
        key: &str,
        origin_prefix: &str,
        destination_prefix: &str,
        origin_bucket_name: &str,
        origin_bucket_region: &str,
    ) -> StorageResult<()> {
        self.copy(
            &blobpath::join(origin_prefix, key),
            None,
            &blobpath::join(destination_prefix, key),
            origin_bucket_name,
            origin_bucket_region,
        )
        .await
    }

    async fn is_versioned(&self) -> StorageResult<bool> {
        self.fetch_versioning_enabled().await
    }
}

/// Builds [`S3Bucket`] handles.
#[derive(Clone, Debug, Default)]
pub struct S3BucketFactory;

#[async_trait]
impl BucketFactory for S3BucketFactory {
    async fn versioned_bucket(&self, spec: &BucketSpec) -> StorageResult<Arc<dyn VersionedBucket>> {
        Ok(Arc::new(S3Bucket::new(spec).await?))
    }

    async fn unversioned_bucket(
        &self,
        spec: &BucketSpec,
    ) -> StorageResult<Arc<dyn UnversionedBucket>> {
        Ok(Arc::new(S3Bucket::new(spec).await?))
    }
}
