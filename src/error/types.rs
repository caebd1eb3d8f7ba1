use thiserror::Error;

pub type StoreResult<T> = ::std::result::Result<T, StoreError>;

pub type UploadResult<T> = ::std::result::Result<T, UploadError>;

/// Exit code of a completed or cleanly rolled back run.
pub const EXIT_OK: u8 = 0;

/// Exit code reported when the run refuses to proceed or cannot clean up.
pub const EXIT_REFUSED: u8 = 255;

/// Exit code for every other fatal error.
pub const EXIT_FATAL: u8 = 1;

/// Errors reported by an object store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The provider answered "not found" (HTTP 404) for the target.
    #[error("(404) {0} not found")]
    NotFound(String),

    /// Any other provider or transport failure.
    #[error("{operation} failed for {target}: {source}")]
    Request {
        /// Name of the storage API call.
        operation: &'static str,
        /// Bucket or `bucket/key` the call addressed.
        target: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn request(
        operation: &'static str,
        target: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Request {
            operation,
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that end a folder upload run.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The destination bucket is missing and creating it was not allowed.
    #[error("bucket {bucket} does not exist and force copy is disabled")]
    BucketMissing { bucket: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// The thread walking the source tree panicked or was cancelled.
    #[error("source tree walk was interrupted: {0}")]
    WalkInterrupted(#[from] tokio::task::JoinError),

    /// Cleanup after an aborted upload failed; remote state is left partial.
    #[error("operation failed: {source} (upload aborted because: {cause})")]
    RollbackFailed { cause: String, source: StoreError },
}

impl UploadError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BucketMissing { .. } | Self::RollbackFailed { .. } => EXIT_REFUSED,
            _ => EXIT_FATAL,
        }
    }
}

/// Errors reported by the worker pool to submitters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// A task failed or a worker died; no further tasks are accepted.
    #[error("worker pool halted")]
    Halted,
}
