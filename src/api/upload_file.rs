//! Upload of a single local file.

use std::{path::PathBuf, sync::Arc};

use builder_pattern::Builder;

use crate::{
    api::{ApiOperation, TransferConfig},
    define_operation_struct,
    error::StoreError,
    util::progress::{ProgressFactory, ProgressReporter},
};

#[derive(Builder)]
pub struct UploadFileConfig {
    /// Bucket name
    #[into]
    pub bucket_name: String,

    /// Local file to upload.
    #[into]
    pub source: PathBuf,

    /// Destination object key.
    #[into]
    pub key_name: String,

    /// Run-wide transfer settings.
    pub transfer: Arc<TransferConfig>,

    /// Builds the progress reporter for this file.
    #[default(ProgressReporter::for_file as ProgressFactory)]
    pub progress: ProgressFactory,
}

define_operation_struct!(UploadFileOperation, UploadFileConfig);

#[async_trait::async_trait]
impl ApiOperation for UploadFileOperation {
    type Response = ();
    type Error = StoreError;

    /// One upload call with a fresh progress reporter. Errors are returned as
    /// is; nothing here retries.
    async fn execute(&self) -> Result<Self::Response, Self::Error> {
        let config = &self.config;
        let progress = Arc::new((config.progress)(&config.source)?);
        tracing::debug!(
            "Uploading {} ({} bytes) to {}/{}",
            config.source.display(),
            progress.total_size(),
            config.bucket_name,
            config.key_name
        );
        self.store
            .upload_file(
                &config.bucket_name,
                &config.source,
                &config.key_name,
                &config.transfer,
                progress,
            )
            .await
    }
}
