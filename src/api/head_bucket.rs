//! Bucket existence check.

use builder_pattern::Builder;

use crate::{
    api::{ApiOperation, validator::is_bucket_name_not_empty},
    define_operation_struct,
    error::StoreError,
};

#[derive(Builder)]
pub struct HeadBucketConfig {
    /// Bucket name
    #[validator(is_bucket_name_not_empty)]
    #[into]
    pub bucket_name: String,
}

define_operation_struct!(HeadBucketOperation, HeadBucketConfig);

#[async_trait::async_trait]
impl ApiOperation for HeadBucketOperation {
    /// `true` when the bucket exists and is reachable.
    type Response = bool;
    type Error = StoreError;

    /// Only "not found" means the bucket is missing. Any other failure, a
    /// permission error included, leaves existence unknown and is returned.
    async fn execute(&self) -> Result<Self::Response, Self::Error> {
        let bucket = self.config.bucket_name.as_str();
        tracing::info!("reaching {}...", bucket);
        match self.store.head_bucket(bucket).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => {
                tracing::info!("{}", err);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
