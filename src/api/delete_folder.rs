//! Bulk deletion of everything under a key prefix.

use builder_pattern::Builder;

use crate::{api::ApiOperation, constant::DELETE_BATCH_SIZE, define_operation_struct, error::StoreError};

#[derive(Builder)]
pub struct DeleteFolderConfig {
    /// Bucket name
    #[into]
    pub bucket_name: String,

    /// Key prefix to clear. Empty clears the whole bucket.
    #[into]
    #[default(String::new())]
    pub prefix: String,
}

define_operation_struct!(DeleteFolderOperation, DeleteFolderConfig);

impl DeleteFolderOperation {
    async fn flush(&self, batch: &mut Vec<String>) -> Result<usize, StoreError> {
        let keys = std::mem::take(batch);
        let count = keys.len();
        tracing::debug!(
            "Deleting {} objects from {}/{}",
            count,
            self.config.bucket_name,
            self.config.prefix
        );
        self.store
            .delete_objects(&self.config.bucket_name, keys)
            .await?;
        Ok(count)
    }
}

#[async_trait::async_trait]
impl ApiOperation for DeleteFolderOperation {
    /// Number of keys sent for deletion.
    type Response = usize;
    type Error = StoreError;

    /// Lists page by page and deletes in batches of at most 1000 keys.
    ///
    /// Best effort: when a batch fails, earlier batches stay deleted and the
    /// rest stays in place.
    async fn execute(&self) -> Result<Self::Response, Self::Error> {
        let config = &self.config;
        let mut batch = Vec::with_capacity(DELETE_BATCH_SIZE);
        let mut token = None;
        let mut deleted = 0;
        loop {
            let page = self
                .store
                .list_objects(&config.bucket_name, &config.prefix, token.take())
                .await?;
            for key in page.keys {
                batch.push(key);
                if batch.len() >= DELETE_BATCH_SIZE {
                    deleted += self.flush(&mut batch).await?;
                }
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        if !batch.is_empty() {
            deleted += self.flush(&mut batch).await?;
        }
        Ok(deleted)
    }
}
