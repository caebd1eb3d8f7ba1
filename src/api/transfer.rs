//! Transfer settings shared by every upload of a run.

use builder_pattern::Builder;

use crate::{
    api::validator::{is_count_positive, is_part_size_valid, is_threshold_valid},
    constant::{MAX_CONCURRENCY, MAX_PART_COUNT, MULTIPART_CHUNKSIZE, MULTIPART_THRESHOLD},
};

/// How single files are sent: when to split them, in which part size, and how
/// many parts of one file may be in flight.
///
/// Built once per run and shared read-only by all workers.
///
/// # Example
///
/// ```
/// use folder_to_s3::api::TransferConfig;
///
/// let config = TransferConfig::new()
///     .multipart_chunksize(8 << 20)
///     .unwrap()
///     .build();
/// assert!(config.uses_multipart(1 << 30));
/// assert!(!config.uses_multipart(1024));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct TransferConfig {
    /// Files of at least this many bytes are uploaded in parts.
    #[default(MULTIPART_THRESHOLD)]
    #[validator(is_threshold_valid)]
    pub multipart_threshold: u64,

    /// Size of each part in bytes.
    #[default(MULTIPART_CHUNKSIZE)]
    #[validator(is_part_size_valid)]
    pub multipart_chunksize: u64,

    /// Parts of one file uploaded at the same time.
    #[default(MAX_CONCURRENCY)]
    #[validator(is_count_positive)]
    pub max_concurrency: usize,

    #[default(true)]
    use_threads: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig::new().build()
    }
}

impl TransferConfig {
    pub fn uses_multipart(&self, size: u64) -> bool {
        size >= self.multipart_threshold
    }

    /// Parts in flight for one file. Without threads parts go one by one.
    pub fn concurrency(&self) -> usize {
        if self.use_threads {
            self.max_concurrency
        } else {
            1
        }
    }

    /// Part size for a file of `size` bytes, grown past the configured chunk
    /// size when the file would otherwise need more parts than S3 allows.
    pub fn part_size(&self, size: u64) -> u64 {
        self.multipart_chunksize.max(size.div_ceil(MAX_PART_COUNT))
    }

    pub fn part_count(&self, size: u64) -> u64 {
        size.div_ceil(self.part_size(size)).max(1)
    }
}
