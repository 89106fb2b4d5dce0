//! store::branch
//!
//! The git-branch backed artifact store.
//!
//! # Design
//!
//! Composes the two transports behind the [`ArtifactStore`] primitives:
//! reads go through the hosted contents API ([`crate::api`]), writes
//! accumulate in a local staging clone ([`crate::git`]) and land as one
//! commit + push. Keys are rooted under the configured path prefix;
//! listings are translated back into prefix-relative keys so callers
//! never see the rooting.
//!
//! # Concurrency
//!
//! Downloads for distinct keys are independent. Uploads serialize on the
//! staging area's index behind a mutex; destination paths are unique per
//! key so staging order does not matter.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::traits::{ArtifactStore, DownloadResult, RemoteListing, StoreError};
use crate::api::GitHubClient;
use crate::core::types::{join_under_prefix, ObjectKey};
use crate::core::PublishConfig;
use crate::git::{CommitIdentity, StagingArea};

/// Artifact store over one branch of one hosted repository.
///
/// Constructed per destination; safe to share across tasks. Holds at
/// most one open staging batch at a time.
pub struct BranchStore {
    /// Read-path / bootstrap API client
    client: GitHubClient,
    /// Destination branch
    branch: String,
    /// Push URL for the staging clone
    remote_url: String,
    /// Transport token for pushes
    token: String,
    /// Path prefix all keys are rooted under
    path_prefix: Option<String>,
    /// The open batch, if any
    staging: Mutex<Option<StagingArea>>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for BranchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchStore")
            .field("branch", &self.branch)
            .field("remote_url", &self.remote_url)
            .field("path_prefix", &self.path_prefix)
            .finish()
    }
}

impl BranchStore {
    /// Create a store for the configured destination.
    pub fn new(config: &PublishConfig) -> Self {
        let remote_url = format!(
            "https://github.com/{}/{}.git",
            config.repository.owner, config.repository.name
        );
        Self::with_endpoints(config, GitHubClient::new(config), remote_url)
    }

    /// Create a store with explicit endpoints.
    ///
    /// Used for GitHub Enterprise installations and test harnesses that
    /// point the API client and the git remote somewhere else.
    pub fn with_endpoints(
        config: &PublishConfig,
        client: GitHubClient,
        remote_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            branch: config.branch.clone(),
            remote_url: remote_url.into(),
            token: config.token.clone(),
            path_prefix: config.path_prefix.clone(),
            staging: Mutex::new(None),
        }
    }

    /// The API client, for bootstrap and administrative callers.
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Root a prefix-relative path under the configured path prefix.
    fn rooted(&self, path: &str) -> String {
        join_under_prefix(self.path_prefix.as_deref(), path)
    }

    /// Translate a repo-rooted remote path back into a store key.
    fn key_for_remote_path(&self, remote_path: &str) -> Result<ObjectKey, StoreError> {
        let relative = match &self.path_prefix {
            Some(prefix) => remote_path
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(remote_path),
            None => remote_path,
        };
        Ok(ObjectKey::new(relative)?)
    }
}

#[async_trait]
impl ArtifactStore for BranchStore {
    async fn list_items(&self, prefix: &str) -> Result<RemoteListing, StoreError> {
        let entries = self.client.list_dir(&self.rooted(prefix)).await?;

        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries.into_iter().filter(|e| e.is_file()) {
            keys.push(self.key_for_remote_path(&entry.path)?);
        }

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
        let url = self.client.download_url(&self.rooted(key.as_str())).await?;
        let content_type = self.client.download_to(&url, dest).await?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            content_type,
        })
    }

    async fn upload_item(&self, key: &ObjectKey, source: &Path) -> Result<(), StoreError> {
        let repo_relative = self.rooted(key.as_str());

        let mut staging = self.staging.lock().unwrap();
        let area = staging.as_mut().ok_or(StoreError::NoBatchOpen)?;
        area.stage(source, &repo_relative)?;
        Ok(())
    }

    async fn begin_batch(&self) -> Result<(), StoreError> {
        {
            let staging = self.staging.lock().unwrap();
            if staging.is_some() {
                return Err(StoreError::BatchAlreadyOpen);
            }
        }

        // Acquisition does network I/O; keep it outside the lock.
        let area = StagingArea::acquire(&self.remote_url, &self.branch, Some(self.token.as_str()))?;

        let mut staging = self.staging.lock().unwrap();
        if staging.is_some() {
            return Err(StoreError::BatchAlreadyOpen);
        }
        *staging = Some(area);
        Ok(())
    }

    async fn commit_batch(&self, label: &str) -> Result<(), StoreError> {
        // Take the area out first: the batch is consumed by the flush
        // whether or not the push succeeds, and a failed run must leave
        // no staging state behind for the next one.
        let mut area = {
            let mut staging = self.staging.lock().unwrap();
            staging.take().ok_or(StoreError::NoBatchOpen)?
        };

        let user = self.client.current_user().await?;
        let identity = CommitIdentity {
            name: user.login.clone(),
            email: user.commit_email(),
        };

        area.commit_and_push(&format!("Add {label}"), &identity)?;
        Ok(())
    }
}
