//! Recursive folder upload with rollback.
//!
//! A run resolves the destination, makes sure the bucket is there, then feeds
//! every file under the source root to a worker pool. When the pool halts,
//! because a task failed or a worker died, whatever was uploaded under the
//! destination root is deleted again, and so is the bucket when this run
//! created it.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    api::{
        ApiOperation, BucketState, DeleteBucketConfig, DeleteBucketOperation, DeleteFolderConfig,
        DeleteFolderOperation, EnsureBucketConfig, EnsureBucketOperation, SharedStore,
        TransferConfig, UploadFileConfig, UploadFileOperation,
    },
    config::UploadConfig,
    error::{EXIT_OK, StoreError, UploadError, UploadResult},
    util::{
        fs::DirTree,
        path::{folder_prefix, object_key},
        pool::{PoolReport, Submitter, WorkerPool},
        progress::{ProgressFactory, ProgressReporter},
    },
};

/// Steps of a run, logged as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    CheckingBucket,
    Uploading,
    Done,
    RollingBack,
    Aborted,
    RollbackFailed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "RESOLVING",
            Stage::CheckingBucket => "CHECKING_BUCKET",
            Stage::Uploading => "UPLOADING",
            Stage::Done => "DONE",
            Stage::RollingBack => "ROLLING_BACK",
            Stage::Aborted => "ABORTED",
            Stage::RollbackFailed => "ROLLBACK_FAILED",
        };
        f.write_str(name)
    }
}

/// How a run ended when it did not end in an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every file was uploaded.
    Completed { uploaded: usize },
    /// The upload was abandoned and cleaned up.
    Aborted {
        cause: String,
        uploaded: usize,
        skipped: usize,
    },
}

/// One file waiting for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub bucket: String,
    pub source: PathBuf,
    pub key: String,
}

#[derive(Debug, Error)]
#[error("upload of {key} failed: {source}")]
pub struct TaskFailure {
    pub key: String,
    pub source: StoreError,
}

pub struct FolderUpload {
    config: UploadConfig,
    store: SharedStore,
    progress: ProgressFactory,
}

impl FolderUpload {
    pub fn new(config: UploadConfig, store: SharedStore) -> Self {
        Self {
            config,
            store,
            progress: ProgressReporter::for_file,
        }
    }

    /// Replaces the per-file progress reporter, e.g. to silence it.
    pub fn with_progress(mut self, progress: ProgressFactory) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self) -> UploadResult<RunOutcome> {
        enter(Stage::Resolving);
        let (bucket, root) = self.config.bucket_and_root();
        tracing::info!(
            "Uploading {} to bucket {} under '{}'",
            self.config.source.display(),
            bucket,
            root
        );

        enter(Stage::CheckingBucket);
        let ensure_config = EnsureBucketConfig::new()
            .bucket_name(bucket.as_str())
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?
            .region(self.config.region.as_str())
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?
            .force_copy(self.config.force_copy)
            .build();
        let ensure_bucket = EnsureBucketOperation::new()
            .config(ensure_config)
            .store(Arc::clone(&self.store))
            .build();
        let state = ensure_bucket.execute().await?;

        enter(Stage::Uploading);
        let (report, walk_error) = self.upload_tree(&bucket, &root).await;
        tracing::info!(
            "Upload finished: {} uploaded, {} skipped, {} failed",
            report.completed,
            report.skipped,
            report.failures.len()
        );

        if !report.is_clean() {
            let cause = abort_cause(&report);
            tracing::error!("Upload aborted: {}", cause);
            return self
                .rollback(&bucket, &root, state, cause, &report)
                .await;
        }
        if let Some(err) = walk_error {
            tracing::error!("Walking {} failed: {}", self.config.source.display(), err);
            return Err(err);
        }
        enter(Stage::Done);
        Ok(RunOutcome::Completed {
            uploaded: report.completed,
        })
    }

    /// Walks the source on a blocking thread, submitting one task per file,
    /// then drains the pool.
    ///
    /// The walk stops at its first error or when the pool refuses a task.
    async fn upload_tree(
        &self,
        bucket: &str,
        root: &str,
    ) -> (PoolReport<TaskFailure>, Option<UploadError>) {
        let transfer = Arc::new(self.config.transfer.clone());
        let store = Arc::clone(&self.store);
        let progress = self.progress;
        let pool = WorkerPool::start(self.config.max_parallelism, move |task: UploadTask| {
            upload_one(Arc::clone(&store), Arc::clone(&transfer), progress, task)
        });

        let submitter = pool.submitter();
        let source = self.config.source.clone();
        let reverse = self.config.reverse;
        let (bucket, root) = (bucket.to_string(), root.to_string());
        let walked = tokio::task::spawn_blocking(move || {
            queue_tree(&submitter, &source, reverse, &bucket, &root)
        })
        .await;
        let walk_error = match walked {
            Ok(None) => None,
            Ok(Some(err)) => Some(UploadError::Walk(err)),
            Err(err) => Some(UploadError::WalkInterrupted(err)),
        };
        (pool.shutdown().await, walk_error)
    }

    async fn rollback(
        &self,
        bucket: &str,
        root: &str,
        state: BucketState,
        cause: String,
        report: &PoolReport<TaskFailure>,
    ) -> UploadResult<RunOutcome> {
        enter(Stage::RollingBack);
        match self.clean_up(bucket, root, state).await {
            Ok(()) => {
                enter(Stage::Aborted);
                Ok(RunOutcome::Aborted {
                    cause,
                    uploaded: report.completed,
                    skipped: report.skipped,
                })
            }
            Err(source) => {
                enter(Stage::RollbackFailed);
                tracing::error!("operation failed: {}", source);
                Err(UploadError::RollbackFailed { cause, source })
            }
        }
    }

    async fn clean_up(&self, bucket: &str, root: &str, state: BucketState) -> Result<(), StoreError> {
        let folder_config = DeleteFolderConfig::new()
            .bucket_name(bucket)
            .prefix(folder_prefix(root))
            .build();
        let delete_folder = DeleteFolderOperation::new()
            .config(folder_config)
            .store(Arc::clone(&self.store))
            .build();
        let deleted = delete_folder.execute().await?;
        tracing::info!("Deleted {} uploaded objects", deleted);

        if state == BucketState::Created {
            let bucket_config = DeleteBucketConfig::new().bucket_name(bucket).build();
            let delete_bucket = DeleteBucketOperation::new()
                .config(bucket_config)
                .store(Arc::clone(&self.store))
                .build();
            delete_bucket.execute().await?;
            tracing::info!("Deleted bucket {}", bucket);
        }
        Ok(())
    }
}

fn enter(stage: Stage) {
    tracing::info!("Entering {}", stage);
}

/// Process exit code of a finished run. A cleanly rolled back run still
/// exits with success.
pub fn exit_status(result: &UploadResult<RunOutcome>) -> u8 {
    match result {
        Ok(RunOutcome::Completed { .. } | RunOutcome::Aborted { .. }) => EXIT_OK,
        Err(err) => err.exit_code(),
    }
}

/// Feeds every file below `source` to the pool. Returns the walk error that
/// stopped it, if any.
fn queue_tree(
    submitter: &Submitter<UploadTask>,
    source: &Path,
    reverse: bool,
    bucket: &str,
    root: &str,
) -> Option<walkdir::Error> {
    for entry in DirTree::new(source, reverse) {
        let path = match entry {
            Ok(path) => path,
            Err(err) => return Some(err),
        };
        let relative = path.strip_prefix(source).unwrap_or(&path);
        let key = object_key(root, relative);
        let task = UploadTask {
            bucket: bucket.to_string(),
            source: path,
            key,
        };
        tracing::debug!("Queueing {} as {}", task.source.display(), task.key);
        if submitter.submit(task).is_err() {
            tracing::warn!("Worker pool halted, no more files are queued");
            break;
        }
    }
    None
}

/// Why the pool halted.
fn abort_cause(report: &PoolReport<TaskFailure>) -> String {
    if let Some(broken) = &report.broken {
        return format!("worker pool broken: {broken}");
    }
    report
        .failures
        .first()
        .map_or_else(|| "upload failed".to_string(), ToString::to_string)
}

async fn upload_one(
    store: SharedStore,
    transfer: Arc<TransferConfig>,
    progress: ProgressFactory,
    task: UploadTask,
) -> Result<(), TaskFailure> {
    let UploadTask {
        bucket,
        source,
        key,
    } = task;
    let config = UploadFileConfig::new()
        .bucket_name(bucket)
        .source(source)
        .key_name(key.as_str())
        .transfer(transfer)
        .progress(progress)
        .build();
    let upload_file = UploadFileOperation::new()
        .config(config)
        .store(store)
        .build();
    upload_file.execute().await.map_err(|source| {
        tracing::error!("Upload of {} failed: {}", key, source);
        TaskFailure { key, source }
    })
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::*;
    use crate::{
        api::memory::MemoryStore,
        error::{EXIT_FATAL, EXIT_REFUSED},
    };

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", "alpha");
        write(dir.path(), "sub/b.txt", "bravo!");
        write(dir.path(), ".DS_Store", "finder");
        dir
    }

    fn config(source: &Path, destination: &str, force_copy: bool) -> UploadConfig {
        config_with_workers(source, destination, force_copy, 2)
    }

    fn config_with_workers(
        source: &Path,
        destination: &str,
        force_copy: bool,
        workers: usize,
    ) -> UploadConfig {
        UploadConfig::new()
            .source(source)
            .unwrap()
            .destination(destination)
            .unwrap()
            .max_parallelism(workers)
            .unwrap()
            .force_copy(force_copy)
            .build()
    }

    fn upload(config: UploadConfig, store: &Arc<MemoryStore>) -> FolderUpload {
        FolderUpload::new(config, store.clone()).with_progress(ProgressReporter::quiet_for_file)
    }

    #[tokio::test]
    async fn uploads_every_file_under_the_destination_root() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::with_bucket("mybucket"));

        let outcome = upload(config(dir.path(), "mybucket/proj", false), &store)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed { uploaded: 2 });
        assert_eq!(store.uploads(), vec!["proj/a.txt", "proj/sub/b.txt"]);
        assert_eq!(store.object_size("mybucket", "proj/a.txt"), Some(5));
        assert_eq!(store.object_size("mybucket", "proj/sub/b.txt"), Some(6));
    }

    #[tokio::test]
    async fn bare_bucket_destination_uses_relative_keys() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::with_bucket("mybucket"));

        upload(config(dir.path(), "mybucket", false), &store)
            .run()
            .await
            .unwrap();

        assert_eq!(store.uploads(), vec!["a.txt", "sub/b.txt"]);
    }

    #[tokio::test]
    async fn missing_bucket_without_force_copy_uploads_nothing() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::default());

        let err = upload(config(dir.path(), "mybucket/proj", false), &store)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::BucketMissing { .. }));
        assert_eq!(err.exit_code(), EXIT_REFUSED);
        assert!(store.uploads().is_empty());
        assert!(store.created_buckets().is_empty());
    }

    #[tokio::test]
    async fn missing_bucket_is_created_with_force_copy() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::default());

        let outcome = upload(config(dir.path(), "mybucket/proj", true), &store)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed { uploaded: 2 });
        assert_eq!(
            store.created_buckets(),
            vec![("mybucket".to_string(), "eu-west-2".to_string())]
        );
    }

    #[tokio::test]
    async fn broken_pool_rolls_back_the_created_bucket() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::default());
        store.panic_on_upload_of("proj/sub/b.txt");

        // One worker: a.txt is uploaded before sub/b.txt crashes it.
        let outcome = upload(config_with_workers(dir.path(), "mybucket/proj", true, 1), &store)
            .run()
            .await
            .unwrap();

        let RunOutcome::Aborted { cause, .. } = outcome else {
            panic!("expected an aborted run, got {outcome:?}");
        };
        assert!(cause.contains("worker pool broken"), "{cause}");
        let calls = store.calls();
        let delete_objects = calls.iter().position(|c| c == "DeleteObjects");
        let delete_bucket = calls.iter().position(|c| c == "DeleteBucket");
        assert!(delete_objects.is_some());
        assert!(delete_objects < delete_bucket);
        assert!(!store.has_bucket("mybucket"));
    }

    #[tokio::test]
    async fn task_failure_rolls_back_but_keeps_an_existing_bucket() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::with_bucket("mybucket"));
        store.put_objects("mybucket", ["other/keep.txt".to_string()]);
        store.fail_upload_of("proj/sub/b.txt");

        let outcome = upload(config(dir.path(), "mybucket/proj", false), &store)
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Aborted { .. }));
        assert!(store.has_bucket("mybucket"));
        assert_eq!(store.objects("mybucket"), vec!["other/keep.txt"]);
        assert!(!store.calls().contains(&"DeleteBucket".to_string()));
    }

    #[tokio::test]
    async fn failed_rollback_is_reported() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::with_bucket("mybucket"));
        store.put_objects("mybucket", ["proj/old.txt".to_string()]);
        store.fail_upload_of("proj/a.txt");
        store.fail_delete_objects("AccessDenied");

        let err = upload(config(dir.path(), "mybucket/proj", false), &store)
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::RollbackFailed { .. }));
        assert_eq!(err.exit_code(), EXIT_REFUSED);
    }

    #[tokio::test]
    async fn failed_bucket_deletion_is_reported() {
        let dir = sample_tree();
        let store = Arc::new(MemoryStore::default());
        store.fail_upload_of("proj/sub/b.txt");
        store.fail_delete_bucket("AccessDenied");

        let err = upload(config_with_workers(dir.path(), "mybucket/proj", true, 1), &store)
            .run()
            .await
            .unwrap_err();

        let UploadError::RollbackFailed { ref source, .. } = err else {
            panic!("expected a failed rollback, got {err:?}");
        };
        assert!(source.to_string().contains("DeleteBucket"), "{source}");
        assert_eq!(err.exit_code(), EXIT_REFUSED);
        assert_eq!(store.calls().last().map(String::as_str), Some("DeleteBucket"));
        assert!(store.has_bucket("mybucket"));
    }

    #[tokio::test]
    async fn walk_error_stops_the_run_without_rollback() {
        let dir = sample_tree();
        let config = config(dir.path(), "mybucket/proj", false);
        // The source disappears between validation and the walk.
        dir.close().unwrap();
        let store = Arc::new(MemoryStore::with_bucket("mybucket"));

        let result = upload(config, &store).run().await;

        assert!(matches!(result, Err(UploadError::Walk(_))), "{result:?}");
        assert_eq!(exit_status(&result), EXIT_FATAL);
        assert!(store.uploads().is_empty());
        assert_eq!(store.calls(), vec!["HeadBucket"]);
        assert!(store.has_bucket("mybucket"));
    }

    #[test]
    fn clean_abort_exits_with_success() {
        let completed = Ok(RunOutcome::Completed { uploaded: 3 });
        let aborted = Ok(RunOutcome::Aborted {
            cause: "worker pool broken".to_string(),
            uploaded: 1,
            skipped: 2,
        });
        let refused = Err(UploadError::BucketMissing {
            bucket: "mybucket".to_string(),
        });
        let invalid = Err(UploadError::InvalidConfig("bad".to_string()));

        assert_eq!(exit_status(&completed), EXIT_OK);
        assert_eq!(exit_status(&aborted), EXIT_OK);
        assert_eq!(exit_status(&refused), EXIT_REFUSED);
        assert_eq!(exit_status(&invalid), EXIT_FATAL);
    }

    #[test]
    fn run_can_be_spawned() {
        fn assert_send<T: Send>(_: &T) {}

        let dir = sample_tree();
        let store = Arc::new(MemoryStore::with_bucket("mybucket"));
        let upload = upload(config(dir.path(), "mybucket/proj", false), &store);
        let run = upload.run();
        assert_send(&run);
    }

    #[test]
    fn stages_render_as_state_names() {
        assert_eq!(Stage::CheckingBucket.to_string(), "CHECKING_BUCKET");
        assert_eq!(Stage::RollbackFailed.to_string(), "ROLLBACK_FAILED");
    }
}
