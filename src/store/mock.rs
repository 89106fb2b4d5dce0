//! store::mock
//!
//! In-memory store implementation for deterministic testing.
//!
//! # Design
//!
//! The mock store keeps committed objects and the open batch in memory
//! and implements the same batch discipline as the branch-backed store:
//! uploads buffer, `commit_batch` flushes them atomically, and an empty
//! batch still records a commit. Failure scenarios are injected per
//! operation and consumed on first use.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use regpages::core::types::ObjectKey;
//! use regpages::store::{ArtifactStore, MockStore};
//!
//! # tokio_test::block_on(async {
//! let store = MockStore::new();
//! store.begin_batch().await.unwrap();
//!
//! let dir = tempfile::tempdir().unwrap();
//! let source = dir.path().join("sample.png");
//! std::fs::write(&source, b"bytes").unwrap();
//!
//! let key = ObjectKey::new("build123/sample.png").unwrap();
//! store.upload_item(&key, &source).await.unwrap();
//! store.commit_batch("build123").await.unwrap();
//!
//! let listing = store.list_items("build123").await.unwrap();
//! assert_eq!(listing.keys, vec![key]);
//! # });
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ArtifactStore, DownloadResult, RemoteListing, StoreError};
use crate::api::ApiError;
use crate::core::types::ObjectKey;

/// In-memory store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share
/// state.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockStoreInner {
    /// Committed objects by key.
    objects: BTreeMap<ObjectKey, Vec<u8>>,
    /// Uploads buffered in the open batch.
    staged: Vec<(ObjectKey, Vec<u8>)>,
    /// Whether a batch is open.
    batch_open: bool,
    /// Labels of committed batches, in order.
    commits: Vec<String>,
    /// Next operation to fail, consumed on first match.
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
///
/// The injected error is consumed when the matching operation runs.
#[derive(Debug)]
pub enum FailOn {
    /// Fail list_items with the given error.
    List(StoreError),
    /// Fail download_item with the given error.
    Download(StoreError),
    /// Fail upload_item with the given error.
    Upload(StoreError),
    /// Fail begin_batch with the given error.
    BeginBatch(StoreError),
    /// Fail commit_batch with the given error.
    CommitBatch(StoreError),
}

/// A recorded store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    List { prefix: String },
    Download { key: ObjectKey },
    Upload { key: ObjectKey },
    BeginBatch,
    CommitBatch { label: String },
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a committed object, as if an earlier run had published it.
    pub fn insert_object(&self, key: ObjectKey, bytes: Vec<u8>) {
        self.inner.lock().unwrap().objects.insert(key, bytes);
    }

    /// Inject a one-shot failure.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.inner.lock().unwrap().fail_on = Some(fail_on);
    }

    /// Bytes of a committed object.
    pub fn object_bytes(&self, key: &ObjectKey) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().objects.get(key).cloned()
    }

    /// All committed keys, in order.
    pub fn committed_keys(&self) -> Vec<ObjectKey> {
        self.inner.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Labels of committed batches, in order.
    pub fn commits(&self) -> Vec<String> {
        self.inner.lock().unwrap().commits.clone()
    }

    /// All recorded operations, in order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }
}

impl MockStoreInner {
    /// Take the injected error if it matches the running operation.
    fn take_failure(&mut self, matches: impl Fn(&FailOn) -> bool) -> Option<StoreError> {
        if self.fail_on.as_ref().is_some_and(&matches) {
            match self.fail_on.take() {
                Some(FailOn::List(e))
                | Some(FailOn::Download(e))
                | Some(FailOn::Upload(e))
                | Some(FailOn::BeginBatch(e))
                | Some(FailOn::CommitBatch(e)) => Some(e),
                None => None,
            }
        } else {
            None
        }
    }
}

#[async_trait]
impl ArtifactStore for MockStore {
    async fn list_items(&self, prefix: &str) -> Result<RemoteListing, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::List {
            prefix: prefix.to_string(),
        });
        if let Some(err) = inner.take_failure(|f| matches!(f, FailOn::List(_))) {
            return Err(err);
        }

        // A prefix that names a stored file is not a directory.
        if let Ok(as_key) = ObjectKey::new(prefix) {
            if inner.objects.contains_key(&as_key) {
                return Err(StoreError::Api(ApiError::NotADirectory {
                    path: prefix.to_string(),
                }));
            }
        }

        let keys = inner
            .objects
            .keys()
            .filter(|key| key.strip_prefix(prefix).is_some())
            .cloned()
            .collect();

        Ok(RemoteListing {
            keys,
            truncated: false,
        })
    }

    async fn download_item(
        &self,
        key: &ObjectKey,
        dest: &Path,
    ) -> Result<DownloadResult, StoreError> {
        let bytes = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .operations
                .push(MockOperation::Download { key: key.clone() });
            if let Some(err) = inner.take_failure(|f| matches!(f, FailOn::Download(_))) {
                return Err(err);
            }
            inner
                .objects
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::Api(ApiError::NotFound(key.to_string())))?
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Other(e.to_string()))?;
        }
        std::fs::write(dest, bytes).map_err(|e| StoreError::Other(e.to_string()))?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            content_type: "application/octet-stream".to_string(),
        })
    }

    async fn upload_item(&self, key: &ObjectKey, source: &Path) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .operations
            .push(MockOperation::Upload { key: key.clone() });
        if let Some(err) = inner.take_failure(|f| matches!(f, FailOn::Upload(_))) {
            return Err(err);
        }
        if !inner.batch_open {
            return Err(StoreError::NoBatchOpen);
        }

        let bytes = std::fs::read(source).map_err(|e| StoreError::Other(e.to_string()))?;
        inner.staged.push((key.clone(), bytes));
        Ok(())
    }

    async fn begin_batch(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::BeginBatch);
        if let Some(err) = inner.take_failure(|f| matches!(f, FailOn::BeginBatch(_))) {
            return Err(err);
        }
        if inner.batch_open {
            return Err(StoreError::BatchAlreadyOpen);
        }

        inner.batch_open = true;
        Ok(())
    }

    async fn commit_batch(&self, label: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::CommitBatch {
            label: label.to_string(),
        });
        if let Some(err) = inner.take_failure(|f| matches!(f, FailOn::CommitBatch(_))) {
            // Failed flush still consumes the batch, like the real store.
            inner.staged.clear();
            inner.batch_open = false;
            return Err(err);
        }
        if !inner.batch_open {
            return Err(StoreError::NoBatchOpen);
        }

        let staged = std::mem::take(&mut inner.staged);
        for (key, bytes) in staged {
            inner.objects.insert(key, bytes);
        }
        inner.commits.push(label.to_string());
        inner.batch_open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn uploads_are_invisible_until_commit() {
        let store = MockStore::new();
        let dir = tempfile::tempdir().unwrap();
        let source = write_temp(&dir, "a.png", b"abc");
        let key = ObjectKey::new("b1/a.png").unwrap();

        store.begin_batch().await.unwrap();
        store.upload_item(&key, &source).await.unwrap();

        assert!(store.list_items("b1").await.unwrap().is_empty());

        store.commit_batch("b1").await.unwrap();
        assert_eq!(store.list_items("b1").await.unwrap().keys, vec![key]);
    }

    #[tokio::test]
    async fn empty_batch_still_records_a_commit() {
        let store = MockStore::new();
        store.begin_batch().await.unwrap();
        store.commit_batch("b1").await.unwrap();
        assert_eq!(store.commits(), vec!["b1".to_string()]);
    }

    #[tokio::test]
    async fn double_begin_is_rejected() {
        let store = MockStore::new();
        store.begin_batch().await.unwrap();
        let err = store.begin_batch().await.unwrap_err();
        assert!(matches!(err, StoreError::BatchAlreadyOpen));
    }

    #[tokio::test]
    async fn listing_a_file_shaped_prefix_fails() {
        let store = MockStore::new();
        let key = ObjectKey::new("b1/a.png").unwrap();
        store.insert_object(key, b"abc".to_vec());

        let err = store.list_items("b1/a.png").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Api(ApiError::NotADirectory { .. })
        ));
    }

    #[tokio::test]
    async fn download_round_trips_bytes() {
        let store = MockStore::new();
        let key = ObjectKey::new("b1/a.png").unwrap();
        store.insert_object(key.clone(), b"payload".to_vec());

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out/a.png");
        let result = store.download_item(&key, &dest).await.unwrap();

        assert_eq!(result.path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MockStore::new();
        store.set_fail_on(FailOn::List(StoreError::Other("boom".into())));

        assert!(store.list_items("b1").await.is_err());
        assert!(store.list_items("b1").await.is_ok());
    }

    #[tokio::test]
    async fn operations_are_recorded_in_order() {
        let store = MockStore::new();
        store.begin_batch().await.unwrap();
        store.commit_batch("b1").await.unwrap();

        assert_eq!(
            store.operations(),
            vec![
                MockOperation::BeginBatch,
                MockOperation::CommitBatch {
                    label: "b1".to_string()
                },
            ]
        );
    }
}
