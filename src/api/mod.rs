mod delete_bucket;
mod delete_folder;
mod ensure_bucket;
mod head_bucket;
#[cfg(test)]
pub(crate) mod memory;
mod multipart;
pub mod s3;
mod store;
mod traits;
mod transfer;
mod upload_file;
pub(crate) mod validator;

pub(crate) use traits::sealed::Sealed;

/// Re-export trait module
pub use traits::ApiOperation;

/// Re-export store module
pub use store::{ObjectPage, ObjectStore, SharedStore};

/// Re-export transfer module
pub use transfer::TransferConfig;

/// Re-export head_bucket module
pub use head_bucket::{HeadBucketConfig, HeadBucketOperation};

/// Re-export ensure_bucket module
pub use ensure_bucket::{BucketState, EnsureBucketConfig, EnsureBucketOperation};

/// Re-export delete_folder module
pub use delete_folder::{DeleteFolderConfig, DeleteFolderOperation};

/// Re-export delete_bucket module
pub use delete_bucket::{DeleteBucketConfig, DeleteBucketOperation};

/// Re-export upload_file module
pub use upload_file::{UploadFileConfig, UploadFileOperation};

pub use s3::S3Store;
