mod types;

pub use types::{
    EXIT_FATAL, EXIT_OK, EXIT_REFUSED, PoolError, StoreError, StoreResult, UploadError, UploadResult,
};
