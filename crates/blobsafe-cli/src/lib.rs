//! Command-line wiring for the `blobsafe` binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use blobsafe_backup::{
    build_bucket_pairs, build_restore_bucket_pairs, build_versioned_buckets, unversioned,
    versioned, Artifact, BackupBucketAddress, BackupError, BackupResult, BucketSnapshot,
    FileArtifact,
};
use blobsafe_core::{
    load_bucket_configs, BucketConfig, ExecutionStrategy, LogLevel, StorageBackend, SystemClock,
    UnversionedBucketConfig,
};
use blobsafe_storage::{create_bucket_factory, BucketFactory};
use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(name = "blobsafe", about = "Back up and restore blob store buckets")]
#[command(group(ArgGroup::new("mode").required(true).args(["backup", "restore"])))]
pub struct Args {
    /// Bucket configuration file (JSON keyed by bucket identifier)
    #[arg(long, env = "BLOBSAFE_CONFIG")]
    pub config: PathBuf,

    /// Backup file to write on backup and read on restore
    #[arg(long, env = "BLOBSAFE_ARTIFACT_FILE")]
    pub artifact_file: PathBuf,

    #[arg(long)]
    pub backup: bool,

    #[arg(long)]
    pub restore: bool,

    /// Copy objects into dedicated backup buckets instead of recording versions
    #[arg(long)]
    pub unversioned: bool,

    /// Storage backend: s3 or local
    #[arg(long, env = "BLOBSAFE_STORAGE_BACKEND", default_value = "s3")]
    pub storage_backend: StorageBackend,

    /// Root directory of the local storage backend
    #[arg(long, env = "BLOBSAFE_LOCAL_STORAGE_PATH")]
    pub local_storage_path: Option<PathBuf>,

    /// How objects of one bucket are copied: serial or parallel
    #[arg(long, env = "BLOBSAFE_EXECUTION_STRATEGY", default_value = "serial")]
    pub execution_strategy: ExecutionStrategy,

    /// Upper bound on concurrent copies for the parallel strategy
    #[arg(long, env = "BLOBSAFE_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long, env = "BLOBSAFE_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Backup,
    Restore,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.backup {
            Mode::Backup
        } else {
            Mode::Restore
        }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.execution_strategy.with_max_in_flight(self.max_in_flight)
    }
}

/// Initialize tracing for the CLI binary.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let factory = create_bucket_factory(args.storage_backend, args.local_storage_path.as_deref())
        .await
        .with_context(|| format!("failed to set up {} storage backend", args.storage_backend))?;

    let mode = args.mode();
    let result = match (args.unversioned, mode) {
        (false, Mode::Backup) => versioned_backup(&args, factory.as_ref()).await,
        (false, Mode::Restore) => versioned_restore(&args, factory.as_ref()).await,
        (true, Mode::Backup) => unversioned_backup(&args, factory.as_ref()).await,
        (true, Mode::Restore) => unversioned_restore(&args, factory.as_ref()).await,
    };

    let action = match mode {
        Mode::Backup => "backup",
        Mode::Restore => "restore",
    };
    result
        .map_err(|err| {
            log_failure(&err);
            err
        })
        .with_context(|| format!("{} failed", action))
}

fn log_failure(err: &BackupError) {
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(error = %err, code = err.error_code(), "Run failed"),
        LogLevel::Warn => tracing::warn!(
            error = %err,
            code = err.error_code(),
            action = err.suggested_action(),
            "Run failed"
        ),
        LogLevel::Error => tracing::error!(
            error = %err,
            code = err.error_code(),
            action = err.suggested_action(),
            "Run failed"
        ),
    }
}

async fn versioned_backup(args: &Args, factory: &dyn BucketFactory) -> BackupResult<()> {
    let configs = load_bucket_configs::<BucketConfig>(&args.config)?;
    let buckets = build_versioned_buckets(&configs, factory).await?;
    let artifact = Arc::new(FileArtifact::<BucketSnapshot>::new(&args.artifact_file));

    versioned::Backuper::new(buckets, artifact).run().await?;
    Ok(())
}

async fn versioned_restore(args: &Args, factory: &dyn BucketFactory) -> BackupResult<()> {
    let configs = load_bucket_configs::<BucketConfig>(&args.config)?;
    let buckets = build_versioned_buckets(&configs, factory).await?;
    let artifact = Arc::new(FileArtifact::<BucketSnapshot>::new(&args.artifact_file));

    versioned::Restorer::new(buckets, artifact).run().await
}

async fn unversioned_backup(args: &Args, factory: &dyn BucketFactory) -> BackupResult<()> {
    let configs = load_bucket_configs::<UnversionedBucketConfig>(&args.config)?;
    let pairs = build_bucket_pairs(&configs, factory, args.strategy()).await?;
    let artifact = Arc::new(FileArtifact::<BackupBucketAddress>::new(&args.artifact_file));

    unversioned::Backuper::new(pairs, artifact, Arc::new(SystemClock))
        .run()
        .await?;
    Ok(())
}

async fn unversioned_restore(args: &Args, factory: &dyn BucketFactory) -> BackupResult<()> {
    let configs = load_bucket_configs::<UnversionedBucketConfig>(&args.config)?;
    let artifact = Arc::new(FileArtifact::<BackupBucketAddress>::new(&args.artifact_file));
    let addresses = artifact.load().await?;
    let pairs = build_restore_bucket_pairs(&configs, &addresses, factory, args.strategy()).await?;

    unversioned::Restorer::new(pairs, artifact)
        .restore_from(&addresses)
        .await
}
