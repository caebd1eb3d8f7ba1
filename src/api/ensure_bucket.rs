//! Bucket lifecycle: use the bucket if present, create it only when allowed.

use builder_pattern::Builder;

use crate::{
    api::{
        ApiOperation, HeadBucketConfig, HeadBucketOperation,
        validator::{is_bucket_name_not_empty, is_region_not_empty},
    },
    define_operation_struct,
    error::UploadError,
};

/// Whether the destination bucket predates this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Existing,
    Created,
}

#[derive(Builder)]
pub struct EnsureBucketConfig {
    /// Bucket name
    #[validator(is_bucket_name_not_empty)]
    #[into]
    pub bucket_name: String,

    /// Region the bucket is created in when missing.
    #[validator(is_region_not_empty)]
    #[into]
    pub region: String,

    /// Create a missing bucket instead of refusing to run.
    #[default(false)]
    pub force_copy: bool,
}

define_operation_struct!(EnsureBucketOperation, EnsureBucketConfig);

#[async_trait::async_trait]
impl ApiOperation for EnsureBucketOperation {
    type Response = BucketState;
    type Error = UploadError;

    async fn execute(&self) -> Result<Self::Response, Self::Error> {
        let config = &self.config;
        let head_config = HeadBucketConfig::new()
            .bucket_name(config.bucket_name.as_str())
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?
            .build();
        let head_bucket = HeadBucketOperation::new()
            .config(head_config)
            .store(self.store.clone())
            .build();
        let exists = head_bucket.execute().await?;
        if exists {
            return Ok(BucketState::Existing);
        }
        if !config.force_copy {
            return Err(UploadError::BucketMissing {
                bucket: config.bucket_name.clone(),
            });
        }
        tracing::info!("creating bucket: {} in {}", config.bucket_name, config.region);
        self.store
            .create_bucket(&config.bucket_name, &config.region)
            .await?;
        Ok(BucketState::Created)
    }
}
