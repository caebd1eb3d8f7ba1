//! Multipart upload of one large file over S3.
//!
//! The file is cut into parts read at their offsets from a shared handle, and
//! the parts are uploaded as separate tasks with a semaphore bounding how many
//! are in flight. A failed upload is aborted so S3 drops the stored parts.

use std::{fs::File, path::Path, sync::Arc};

use aws_sdk_s3::{
    Client,
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
};
use tokio::{
    sync::Semaphore,
    task::{AbortHandle, JoinHandle},
};

use crate::{
    api::{TransferConfig, s3::sdk_error},
    error::{StoreError, StoreResult},
    util::{fs::ChunkFile, progress::ProgressReporter},
};

/// Location of one upload part inside the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PartSpec {
    pub(crate) number: i32,
    pub(crate) offset: u64,
    pub(crate) size: u64,
}

/// Splits `size` bytes into consecutive parts numbered from 1.
pub(crate) fn plan_parts(size: u64, transfer: &TransferConfig) -> Vec<PartSpec> {
    let part_size = transfer.part_size(size);
    (0..transfer.part_count(size))
        .map(|index| {
            let offset = index * part_size;
            PartSpec {
                number: index as i32 + 1,
                offset,
                size: part_size.min(size - offset),
            }
        })
        .collect()
}

pub(crate) async fn upload(
    client: &Client,
    bucket: &str,
    source: &Path,
    key: &str,
    size: u64,
    transfer: &TransferConfig,
    progress: Arc<ProgressReporter>,
) -> StoreResult<()> {
    let target = format!("{bucket}/{key}");
    let created = client
        .create_multipart_upload()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| sdk_error("CreateMultipartUpload", &target, e))?;
    let upload_id = created
        .upload_id()
        .ok_or_else(|| {
            StoreError::request("CreateMultipartUpload", &target, "response carried no upload id")
        })?
        .to_owned();

    let parts = plan_parts(size, transfer);
    tracing::debug!(
        "Uploading {} in {} parts, upload id {}",
        target,
        parts.len(),
        upload_id
    );
    let uploaded = upload_parts(
        client,
        bucket,
        key,
        &upload_id,
        source,
        parts,
        transfer.concurrency(),
        progress,
    )
    .await;

    let completed = match uploaded {
        Ok(completed) => completed,
        Err(err) => {
            abort(client, bucket, key, &upload_id).await;
            return Err(err);
        }
    };
    let finished = client
        .complete_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(&upload_id)
        .multipart_upload(
            CompletedMultipartUpload::builder()
                .set_parts(Some(completed))
                .build(),
        )
        .send()
        .await;
    if let Err(err) = finished {
        abort(client, bucket, key, &upload_id).await;
        return Err(sdk_error("CompleteMultipartUpload", &target, err));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn upload_parts(
    client: &Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    source: &Path,
    parts: Vec<PartSpec>,
    concurrency: usize,
    progress: Arc<ProgressReporter>,
) -> StoreResult<Vec<CompletedPart>> {
    let file = Arc::new(File::open(source)?);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let target = format!("{bucket}/{key}");

    let mut tasks = Vec::with_capacity(parts.len());
    for part in parts {
        let client = client.clone();
        let file = Arc::clone(&file);
        let semaphore = Arc::clone(&semaphore);
        let progress = Arc::clone(&progress);
        let (bucket, key, upload_id, target) = (
            bucket.to_owned(),
            key.to_owned(),
            upload_id.to_owned(),
            target.clone(),
        );
        tasks.push(tokio::spawn(async move {
            // The permit is held until the part is sent, bounding parts in memory.
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| StoreError::request("UploadPart", &target, e))?;
            let chunk = tokio::task::spawn_blocking(move || {
                ChunkFile::create_chunk_file(&file, part.offset, part.size)
            })
            .await
            .map_err(|e| StoreError::request("UploadPart", &target, e))??;
            let length = chunk.size();
            if length != part.size {
                return Err(StoreError::request(
                    "UploadPart",
                    &target,
                    format!("file shrank: read {length} of {} bytes", part.size),
                ));
            }
            let output = client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part.number)
                .content_length(length as i64)
                .body(ByteStream::from(chunk.into_bytes()))
                .send()
                .await
                .map_err(|e| sdk_error("UploadPart", &target, e))?;
            progress.update(length);
            tracing::debug!("Part {} of {} uploaded", part.number, target);
            Ok::<_, StoreError>(
                CompletedPart::builder()
                    .part_number(part.number)
                    .set_e_tag(output.e_tag().map(str::to_owned))
                    .build(),
            )
        }));
    }

    join_parts(tasks, &target).await
}

/// Waits for every part in order. At the first failure the parts still queued
/// or in flight are cancelled and that failure is returned.
pub(crate) async fn join_parts<T>(
    tasks: Vec<JoinHandle<StoreResult<T>>>,
    target: &str,
) -> StoreResult<Vec<T>> {
    let aborts = tasks.iter().map(JoinHandle::abort_handle).collect::<Vec<_>>();
    let joined = futures::future::try_join_all(tasks.into_iter().map(|task| async move {
        task.await
            .map_err(|e| StoreError::request("UploadPart", target, e))?
    }))
    .await;
    if joined.is_err() {
        aborts.iter().for_each(AbortHandle::abort);
    }
    joined
}

async fn abort(client: &Client, bucket: &str, key: &str, upload_id: &str) {
    let aborted = client
        .abort_multipart_upload()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .send()
        .await;
    match aborted {
        Ok(_) => tracing::info!("Aborted multipart upload of {}/{}", bucket, key),
        Err(err) => tracing::error!(
            "Failed to abort multipart upload {} of {}/{}: {}",
            upload_id,
            bucket,
            key,
            DisplayErrorContext(&err)
        ),
    }
}
