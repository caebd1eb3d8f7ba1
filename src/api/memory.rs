//! In-memory object store used by the tests.

use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    api::{ObjectPage, ObjectStore, TransferConfig},
    constant::DELETE_BATCH_SIZE,
    error::{StoreError, StoreResult},
    util::progress::ProgressReporter,
};

/// Keys returned per listing page, as S3 does.
const PAGE_SIZE: usize = 1000;

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    buckets: BTreeMap<String, BTreeMap<String, u64>>,
    calls: Vec<String>,
    uploads: Vec<String>,
    created: Vec<(String, String)>,
    delete_batches: Vec<usize>,
    head_failure: Option<String>,
    create_failure: Option<String>,
    delete_objects_failure: Option<String>,
    delete_bucket_failure: Option<String>,
    failing_uploads: HashSet<String>,
    panicking_uploads: HashSet<String>,
}

fn injected(operation: &'static str, target: &str, message: &str) -> StoreError {
    StoreError::request(operation, target, message.to_string())
}

impl MemoryStore {
    pub(crate) fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store
            .lock()
            .buckets
            .insert(bucket.to_string(), BTreeMap::new());
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn put_objects(&self, bucket: &str, keys: impl IntoIterator<Item = String>) {
        let mut state = self.lock();
        let objects = state.buckets.entry(bucket.to_string()).or_default();
        for key in keys {
            objects.insert(key, 0);
        }
    }

    pub(crate) fn fail_head_bucket(&self, message: &str) {
        self.lock().head_failure = Some(message.to_string());
    }

    pub(crate) fn fail_create_bucket(&self, message: &str) {
        self.lock().create_failure = Some(message.to_string());
    }

    pub(crate) fn fail_delete_objects(&self, message: &str) {
        self.lock().delete_objects_failure = Some(message.to_string());
    }

    pub(crate) fn fail_delete_bucket(&self, message: &str) {
        self.lock().delete_bucket_failure = Some(message.to_string());
    }

    pub(crate) fn fail_upload_of(&self, key: &str) {
        self.lock().failing_uploads.insert(key.to_string());
    }

    /// Uploading `key` panics, taking its worker down.
    pub(crate) fn panic_on_upload_of(&self, key: &str) {
        self.lock().panicking_uploads.insert(key.to_string());
    }

    /// Operation names in call order, e.g. `"DeleteObjects"`.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Keys of every upload attempt, sorted.
    pub(crate) fn uploads(&self) -> Vec<String> {
        let mut uploads = self.lock().uploads.clone();
        uploads.sort();
        uploads
    }

    pub(crate) fn created_buckets(&self) -> Vec<(String, String)> {
        self.lock().created.clone()
    }

    pub(crate) fn delete_batches(&self) -> Vec<usize> {
        self.lock().delete_batches.clone()
    }

    pub(crate) fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.contains_key(bucket)
    }

    pub(crate) fn objects(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn object_size(&self, bucket: &str, key: &str) -> Option<u64> {
        self.lock().buckets.get(bucket)?.get(key).copied()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_bucket(&self, bucket: &str) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.push("HeadBucket".into());
        if let Some(message) = &state.head_failure {
            return Err(injected("HeadBucket", bucket, message));
        }
        if state.buckets.contains_key(bucket) {
            Ok(())
        } else {
            Err(StoreError::NotFound(bucket.to_string()))
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.push("CreateBucket".into());
        if let Some(message) = &state.create_failure {
            return Err(injected("CreateBucket", bucket, message));
        }
        state.buckets.insert(bucket.to_string(), BTreeMap::new());
        state.created.push((bucket.to_string(), region.to_string()));
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.push("DeleteBucket".into());
        if let Some(message) = &state.delete_bucket_failure {
            return Err(injected("DeleteBucket", bucket, message));
        }
        let Some(objects) = state.buckets.get(bucket) else {
            return Err(StoreError::NotFound(bucket.to_string()));
        };
        if !objects.is_empty() {
            return Err(injected("DeleteBucket", bucket, "BucketNotEmpty"));
        }
        state.buckets.remove(bucket);
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> StoreResult<ObjectPage> {
        let mut state = self.lock();
        state.calls.push("ListObjectsV2".into());
        let objects = state
            .buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NotFound(bucket.to_string()))?;
        // The token is the last key of the previous page.
        let mut keys = objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| continuation_token.as_ref().is_none_or(|after| *key > after))
            .take(PAGE_SIZE + 1)
            .cloned()
            .collect::<Vec<_>>();
        let next_token = if keys.len() > PAGE_SIZE {
            keys.truncate(PAGE_SIZE);
            keys.last().cloned()
        } else {
            None
        };
        Ok(ObjectPage { keys, next_token })
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> StoreResult<()> {
        let mut state = self.lock();
        state.calls.push("DeleteObjects".into());
        assert!(keys.len() <= DELETE_BATCH_SIZE, "delete batch over the S3 limit");
        if let Some(message) = &state.delete_objects_failure {
            return Err(injected("DeleteObjects", bucket, message));
        }
        state.delete_batches.push(keys.len());
        if let Some(objects) = state.buckets.get_mut(bucket) {
            for key in &keys {
                objects.remove(key);
            }
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        source: &Path,
        key: &str,
        _transfer: &TransferConfig,
        progress: Arc<ProgressReporter>,
    ) -> StoreResult<()> {
        let size = tokio::fs::metadata(source).await?.len();
        let (fails, panics) = {
            let mut state = self.lock();
            state.calls.push("PutObject".into());
            state.uploads.push(key.to_string());
            (
                state.failing_uploads.contains(key),
                state.panicking_uploads.contains(key),
            )
        };
        if panics {
            panic!("upload worker for {key} crashed");
        }
        if fails {
            return Err(injected("PutObject", &format!("{bucket}/{key}"), "AccessDenied"));
        }
        progress.update(size / 2);
        tokio::task::yield_now().await;
        progress.update(size - size / 2);

        let mut state = self.lock();
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NotFound(bucket.to_string()))?;
        objects.insert(key.to_string(), size);
        Ok(())
    }
}
