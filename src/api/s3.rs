//! [`ObjectStore`] backed by the AWS S3 SDK.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::http::HttpResponse,
    error::SdkError,
    operation::head_bucket::HeadBucketError,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier},
};

use crate::{
    api::{ObjectPage, ObjectStore, TransferConfig, multipart},
    error::{StoreError, StoreResult},
    util::progress::ProgressReporter,
};

/// The one region S3 refuses as an explicit location constraint.
const DEFAULT_S3_REGION: &str = "us-east-1";

#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Maps an SDK failure, turning HTTP 404 into [`StoreError::NotFound`].
pub(crate) fn sdk_error<E>(
    operation: &'static str,
    target: &str,
    err: SdkError<E, HttpResponse>,
) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if err
        .raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
    {
        return StoreError::NotFound(target.to_string());
    }
    StoreError::request(operation, target, err)
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(HeadBucketError::is_not_found)
                {
                    return Err(StoreError::NotFound(bucket.to_string()));
                }
                Err(sdk_error("HeadBucket", bucket, err))
            }
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> StoreResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if region != DEFAULT_S3_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        let output = request
            .send()
            .await
            .map_err(|e| sdk_error("CreateBucket", bucket, e))?;
        tracing::debug!("Created bucket at {:?}", output.location());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteBucket", bucket, e))?;
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> StoreResult<ObjectPage> {
        let target = format!("{bucket}/{prefix}");
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| sdk_error("ListObjectsV2", &target, e))?;
        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();
        let next_token = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(str::to_owned)
        } else {
            None
        };
        Ok(ObjectPage { keys, next_token })
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> StoreResult<()> {
        let objects = keys
            .into_iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::request("DeleteObjects", bucket, e))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| StoreError::request("DeleteObjects", bucket, e))?;
        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteObjects", bucket, e))?;
        for error in output.errors() {
            tracing::warn!(
                "Failed to delete {}: {}",
                error.key().unwrap_or("unknown"),
                error.message().unwrap_or("unknown error")
            );
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        source: &Path,
        key: &str,
        transfer: &TransferConfig,
        progress: Arc<ProgressReporter>,
    ) -> StoreResult<()> {
        let size = tokio::fs::metadata(source).await?.len();
        if transfer.uses_multipart(size) {
            return multipart::upload(&self.client, bucket, source, key, size, transfer, progress)
                .await;
        }
        let target = format!("{bucket}/{key}");
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StoreError::request("PutObject", &target, e))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| sdk_error("PutObject", &target, e))?;
        progress.update(size);
        Ok(())
    }
}
