use builder_pattern::Builder;

use crate::{api::ApiOperation, define_operation_struct, error::StoreError};

#[derive(Builder)]
pub struct DeleteBucketConfig {
    /// Bucket name. The bucket must already be empty.
    #[into]
    pub bucket_name: String,
}

define_operation_struct!(DeleteBucketOperation, DeleteBucketConfig);

#[async_trait::async_trait]
impl ApiOperation for DeleteBucketOperation {
    type Response = ();
    type Error = StoreError;

    async fn execute(&self) -> Result<Self::Response, Self::Error> {
        tracing::info!("attempting to delete {}", self.config.bucket_name);
        self.store.delete_bucket(&self.config.bucket_name).await
    }
}
