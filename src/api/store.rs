//! The object store seam. Operations talk to storage only through
//! [`ObjectStore`]; the S3 client implements it in production.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use crate::{api::TransferConfig, error::StoreResult, util::progress::ProgressReporter};

pub type SharedStore = Arc<dyn ObjectStore>;

/// One page of a key listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Token for the next page, `None` on the last one.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Probes a bucket. A missing bucket is reported as
    /// [`StoreError::NotFound`](crate::error::StoreError::NotFound).
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> StoreResult<()>;

    /// Removes an empty bucket.
    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> StoreResult<ObjectPage>;

    /// Deletes at most 1000 keys in one request.
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> StoreResult<()>;

    /// Uploads one local file, reporting transferred bytes to `progress`.
    async fn upload_file(
        &self,
        bucket: &str,
        source: &Path,
        key: &str,
        transfer: &TransferConfig,
        progress: Arc<ProgressReporter>,
    ) -> StoreResult<()>;
}
