//! store::traits
//!
//! The artifact store capability contract.
//!
//! # Design
//!
//! The external diffing/traversal engine that decides *which* artifacts
//! differ drives this crate item-by-item through [`ArtifactStore`]. The
//! trait is async because every implementation ultimately does network
//! I/O, and it is deliberately small: list, download, buffered upload,
//! and the two batch boundaries. Composition over inheritance; callers
//! hold a `&dyn ArtifactStore` and never know which backing they got.
//!
//! # Batch discipline
//!
//! Uploads are buffered: `upload_item` stages into the open batch and
//! the remote is only mutated by `commit_batch`, exactly once per batch.
//! Either the whole batch lands or none of it does.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::api::ApiError;
use crate::core::types::{ObjectKey, TypeError};
use crate::git::GitError;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The hosted API failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Git transport failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// A remote path could not be expressed as a key.
    #[error(transparent)]
    Key(#[from] TypeError),

    /// `upload_item`/`commit_batch` was called with no batch open.
    #[error("no staging batch is open; call begin_batch first")]
    NoBatchOpen,

    /// `begin_batch` was called while a batch was already open.
    #[error("a staging batch is already open")]
    BatchAlreadyOpen,

    /// Implementation-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Result of a list operation: the keys found under a prefix.
///
/// Order is irrelevant. `truncated` is always false in this design; the
/// read path does not paginate.
#[derive(Debug, Clone, Default)]
pub struct RemoteListing {
    /// Keys found under the prefix, relative to the store's root.
    pub keys: Vec<ObjectKey>,
    /// Whether the listing was cut short (never, currently).
    pub truncated: bool,
}

impl RemoteListing {
    /// Whether nothing was found under the prefix.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A local file materialized from one remote key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Content type reported by the remote fetch.
    pub content_type: String,
}

/// The store primitives the orchestrator drives.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. Calls for distinct keys are
/// mutually independent and may be issued concurrently by the caller up
/// to a bounded worker count; `begin_batch`/`commit_batch` are exclusive
/// boundaries and must not overlap any other call on the same store.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// List the keys currently stored under `prefix`.
    ///
    /// An absent prefix yields an empty listing, not an error; a prefix
    /// that denotes a file fails with [`ApiError::NotADirectory`].
    async fn list_items(&self, prefix: &str) -> Result<RemoteListing, StoreError>;

    /// Download one key's content into `dest`.
    async fn download_item(
        &self,
        key: &ObjectKey,
        dest: &Path,
    ) -> Result<DownloadResult, StoreError>;

    /// Buffer one local file for upload under `key`.
    ///
    /// The remote is not touched; the actual mutation happens in
    /// [`commit_batch`](Self::commit_batch).
    async fn upload_item(&self, key: &ObjectKey, source: &Path) -> Result<(), StoreError>;

    /// Open the staging batch for a publish run.
    async fn begin_batch(&self) -> Result<(), StoreError>;

    /// Flush the open batch as one atomic remote mutation.
    ///
    /// Runs even when nothing was uploaded; empty batches commit too.
    /// The batch is closed afterwards, successful or not.
    async fn commit_batch(&self, label: &str) -> Result<(), StoreError>;
}
