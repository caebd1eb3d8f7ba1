//! Settings of one folder upload run.

use std::path::PathBuf;

use builder_pattern::Builder;

use crate::{
    api::{
        TransferConfig,
        validator::{is_count_positive, is_destination_valid, is_region_not_empty, is_source_dir_valid},
    },
    constant::{DEFAULT_REGION, MAX_PARALLELISM},
    util::path::reverse_split,
};

#[derive(Debug, Clone, Builder)]
pub struct UploadConfig {
    /// Local directory whose files are uploaded.
    #[validator(is_source_dir_valid)]
    #[into]
    pub source: PathBuf,

    /// `bucket` or `bucket/folder/...`.
    #[validator(is_destination_valid)]
    #[into]
    pub destination: String,

    /// Region a missing bucket is created in.
    #[default(DEFAULT_REGION.to_string())]
    #[validator(is_region_not_empty)]
    #[into]
    pub region: String,

    /// Files uploaded at the same time.
    #[default(MAX_PARALLELISM)]
    #[validator(is_count_positive)]
    pub max_parallelism: usize,

    #[default(false)]
    pub force_copy: bool,

    /// Walk each directory in reverse name order.
    #[default(false)]
    pub reverse: bool,

    #[default(TransferConfig::default())]
    pub transfer: TransferConfig,
}

impl UploadConfig {
    /// Bucket name and the key prefix root (possibly empty).
    pub fn bucket_and_root(&self) -> (String, String) {
        reverse_split(&self.destination)
    }
}
