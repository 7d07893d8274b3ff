//! blobsafe: back up and restore blob store buckets.
//!
//! `blobsafe --config <file> --artifact-file <file> (--backup | --restore) [--unversioned]`

use blobsafe_cli::{init_tracing, run, Args};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(args.log_json);

    run(args).await
}
