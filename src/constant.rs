/// Default file size above which uploads are split into parts (1GB).
pub(crate) const MULTIPART_THRESHOLD: u64 = 1 << 30;

/// Default size of one multipart part (512MB).
pub(crate) const MULTIPART_CHUNKSIZE: u64 = 512 << 20;

/// Smallest part S3 accepts for anything but the last part (5MB).
pub(crate) const MIN_PART_SIZE: u64 = 5 << 20;

/// S3 refuses multipart uploads with more parts than this.
pub(crate) const MAX_PART_COUNT: u64 = 10_000;

/// Default number of parts in flight for one file.
pub(crate) const MAX_CONCURRENCY: usize = 8;

/// Default number of files uploaded at the same time.
pub(crate) const MAX_PARALLELISM: usize = 8;

pub(crate) const DEFAULT_REGION: &str = "eu-west-2";

/// Upper bound of keys accepted by a single DeleteObjects call.
pub(crate) const DELETE_BATCH_SIZE: usize = 1000;

/// Finder metadata files are never uploaded.
pub(crate) const OS_METADATA_SUFFIX: &str = ".DS_Store";
