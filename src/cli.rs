//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::{
    api::TransferConfig,
    config::UploadConfig,
    constant::DEFAULT_REGION,
    error::UploadError,
};

const GIB: u64 = 1 << 30;
const MIB: u64 = 1 << 20;

/// Upload a local folder, recursively, to an S3 bucket.
#[derive(Debug, Parser)]
#[command(name = "folder-to-s3", version, about)]
pub struct Cli {
    /// Local directory to upload.
    pub src: PathBuf,

    /// Destination, `bucket` or `bucket/folder`.
    pub dst: String,

    /// Size in GB from which files are uploaded in parts.
    #[arg(short = 't', long = "multipart_threshold", visible_alias = "mt", default_value_t = 1)]
    pub multipart_threshold: u64,

    /// Part size in MB for multipart uploads.
    #[arg(short = 's', long = "multipart_chunksize", visible_alias = "ms", default_value_t = 512)]
    pub multipart_chunksize: u64,

    /// Files uploaded at the same time.
    #[arg(short = 'p', long = "max_parallelism", visible_alias = "mp", default_value_t = 8)]
    pub max_parallelism: usize,

    /// Parts of one file uploaded at the same time.
    #[arg(short = 'c', long = "max_concurrency", visible_alias = "mc", default_value_t = 8)]
    pub max_concurrency: usize,

    /// Region a missing bucket is created in.
    #[arg(short = 'r', long, default_value = DEFAULT_REGION)]
    pub region: String,

    /// Create the bucket when it does not exist.
    #[arg(short = 'f', long = "force_copy", visible_alias = "fc")]
    pub force_copy: bool,

    /// Walk file names in reverse lexicographic order.
    #[arg(long)]
    pub reverse: bool,

    /// S3 compatible endpoint to use instead of AWS.
    #[arg(long = "endpoint-url")]
    pub endpoint_url: Option<String>,

    /// Address buckets by path instead of by virtual host.
    #[arg(long = "path-style")]
    pub path_style: bool,

    /// Do not render per-file progress lines.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

fn invalid(e: impl ToString) -> UploadError {
    UploadError::InvalidConfig(e.to_string())
}

fn scale(value: u64, unit: u64, flag: &str) -> Result<u64, UploadError> {
    value
        .checked_mul(unit)
        .ok_or_else(|| invalid(format!("{flag} is too large")))
}

impl TryFrom<&Cli> for UploadConfig {
    type Error = UploadError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let transfer = TransferConfig::new()
            .multipart_threshold(scale(cli.multipart_threshold, GIB, "multipart_threshold")?)
            .map_err(invalid)?
            .multipart_chunksize(scale(cli.multipart_chunksize, MIB, "multipart_chunksize")?)
            .map_err(invalid)?
            .max_concurrency(cli.max_concurrency)
            .map_err(invalid)?
            .build();

        Ok(UploadConfig::new()
            .source(cli.src.as_path())
            .map_err(invalid)?
            .destination(cli.dst.as_str())
            .map_err(invalid)?
            .region(cli.region.as_str())
            .map_err(invalid)?
            .max_parallelism(cli.max_parallelism)
            .map_err(invalid)?
            .force_copy(cli.force_copy)
            .reverse(cli.reverse)
            .transfer(transfer)
            .build())
    }
}
