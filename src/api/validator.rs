//! This module provides validator functions for config field checking.
use std::path::PathBuf;

use crate::constant::MIN_PART_SIZE;

/// Check the given key is not empty.
fn is_not_empty(key: String, error_msg: &'static str) -> Result<String, &'static str> {
    if key.is_empty() {
        return Err(error_msg);
    }
    Ok(key)
}

/// Check the given bucket name is empty or not.
pub(crate) fn is_bucket_name_not_empty(bucket_name: String) -> Result<String, &'static str> {
    is_not_empty(bucket_name, "bucket name can not be empty")
}

pub(crate) fn is_region_not_empty(region: String) -> Result<String, &'static str> {
    is_not_empty(region, "region can not be empty")
}

/// The destination must start with a bucket name: `bucket` or `bucket/folder`.
pub(crate) fn is_destination_valid(destination: String) -> Result<String, &'static str> {
    if destination.split('/').next().unwrap_or_default().is_empty() {
        return Err("destination must start with a bucket name");
    }
    Ok(destination)
}

pub(crate) fn is_source_dir_valid(source: PathBuf) -> Result<PathBuf, &'static str> {
    match std::fs::metadata(&source) {
        Ok(meta) if meta.is_dir() => Ok(source),
        Ok(_) => Err("source must be a directory"),
        Err(e) => {
            tracing::error!("get source metadata error: {:?}", e);
            Err("source folder can not be read")
        }
    }
}

pub(crate) fn is_count_positive(count: usize) -> Result<usize, &'static str> {
    if count == 0 {
        return Err("worker and thread counts must be at least 1");
    }
    Ok(count)
}

pub(crate) fn is_threshold_valid(threshold: u64) -> Result<u64, &'static str> {
    if threshold == 0 {
        return Err("multipart threshold must be positive");
    }
    Ok(threshold)
}

/// S3 rejects parts smaller than 5MB, except for the last one.
pub(crate) fn is_part_size_valid(part_size: u64) -> Result<u64, &'static str> {
    if part_size < MIN_PART_SIZE {
        return Err("multipart chunk size must be at least 5MB");
    }
    Ok(part_size)
}
