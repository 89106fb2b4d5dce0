//! sync
//!
//! The publish/fetch orchestrator.
//!
//! # Design
//!
//! [`Publisher`] sequences one synchronization run over an
//! [`ArtifactStore`]: publish is clone, stage every handed-in item,
//! then exactly one commit+push; fetch is list plus bounded-concurrency
//! downloads. The orchestrator never decides *which* items differ
//! (that is the external diff engine's job); it only executes what it
//! is handed and computes the externally reported report URL.
//!
//! # Run shape
//!
//! A publish run moves through `idle → cloning → staging → committing →
//! pushed`, or drops to failed from any state. Failures are terminal for
//! the run: the staging clone is discarded and the remote branch is left
//! unchanged.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::types::{ObjectKey, TypeError};
use crate::core::PublishConfig;
use crate::store::{ArtifactStore, BranchStore, DownloadResult, StoreError};

/// Bounded worker count for fetch downloads.
const DOWNLOAD_WORKERS: usize = 4;

/// Errors from orchestration.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A local path could not be expressed as a key.
    #[error(transparent)]
    Key(#[from] TypeError),

    /// Local directory traversal failed.
    #[error("failed to walk '{path}': {message}")]
    Walk {
        /// The directory being walked
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// The configured eligibility pattern is malformed.
    #[error("invalid pattern: {0}")]
    Pattern(String),
}

/// One file the caller wants uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    /// Local source file.
    pub source: PathBuf,
    /// Destination key (already rooted under the batch label).
    pub key: ObjectKey,
}

/// Outcome of a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// The externally visible URL of the published report.
    pub report_url: String,
    /// How many items were uploaded in the batch.
    pub uploaded: usize,
}

/// The publish/fetch orchestrator for one destination.
pub struct Publisher {
    /// The store primitives this run drives
    store: Arc<dyn ArtifactStore>,
    /// Repository owner, for the default URL convention
    owner: String,
    /// Repository name, for the default URL convention
    repo: String,
    /// Custom public hostname, when configured
    custom_domain: Option<String>,
    /// Eligibility pattern for local uploads
    pattern: Option<String>,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("custom_domain", &self.custom_domain)
            .finish()
    }
}

impl Publisher {
    /// Create a publisher over an explicit store.
    pub fn new(config: &PublishConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            owner: config.repository.owner.clone(),
            repo: config.repository.name.clone(),
            custom_domain: config.custom_domain.clone(),
            pattern: config.pattern.clone(),
        }
    }

    /// Create a publisher backed by the branch store for `config`.
    pub fn from_config(config: &PublishConfig) -> Self {
        Self::new(config, Arc::new(BranchStore::new(config)))
    }

    /// The public hostname reports are served from.
    ///
    /// The custom domain wins when configured; otherwise the
    /// `<owner>.github.io/<name>` convention applies.
    pub fn base_url(&self) -> String {
        match &self.custom_domain {
            Some(domain) => domain.clone(),
            None => format!("{}.github.io/{}", self.owner, self.repo),
        }
    }

    /// The externally reported URL for one batch label.
    ///
    /// The storage path prefix never appears in the URL; it is a layout
    /// detail of the branch, not of the served site.
    pub fn report_url(&self, label: &str) -> String {
        format!("https://{}/{}", self.base_url(), label)
    }

    /// Publish a batch: stage every handed-in item, then flush the
    /// batch with exactly one commit + push.
    ///
    /// The commit/push step runs even when `items` is empty; empty
    /// batches still produce a commit.
    pub async fn publish(
        &self,
        label: &str,
        items: &[UploadEntry],
    ) -> Result<PublishReport, SyncError> {
        self.store.begin_batch().await?;

        for item in items {
            self.store.upload_item(&item.key, &item.source).await?;
        }

        self.store.commit_batch(label).await?;

        Ok(PublishReport {
            report_url: self.report_url(label),
            uploaded: items.len(),
        })
    }

    /// Fetch a batch: download everything stored under `label` into
    /// `dest_dir`, preserving the paths below the label.
    ///
    /// Read-only; no staging area is involved. Downloads run with a
    /// bounded worker pool since distinct keys touch disjoint paths.
    pub async fn fetch(
        &self,
        label: &str,
        dest_dir: &Path,
    ) -> Result<Vec<DownloadResult>, SyncError> {
        let listing = self.store.list_items(label).await?;

        let results = stream::iter(listing.keys)
            .map(|key| {
                let store = Arc::clone(&self.store);
                let dest = match key.strip_prefix(label) {
                    Some(relative) => dest_dir.join(relative),
                    None => dest_dir.join(key.as_str()),
                };
                async move {
                    store
                        .download_item(&key, &dest)
                        .await
                        .map_err(SyncError::from)
                }
            })
            .buffer_unordered(DOWNLOAD_WORKERS)
            .try_collect()
            .await?;

        Ok(results)
    }

    /// Collect upload entries for everything under `dir`, keyed as
    /// `<label>/<relative path>`.
    ///
    /// Honors the configured eligibility pattern, matched against the
    /// slash-normalized relative path. Entries come back sorted by key
    /// so staging order is deterministic.
    pub fn collect_uploads(&self, label: &str, dir: &Path) -> Result<Vec<UploadEntry>, SyncError> {
        let matcher = self
            .pattern
            .as_deref()
            .map(glob_to_regex)
            .transpose()?;

        let mut entries = Vec::new();
        for walked in WalkDir::new(dir) {
            let walked = walked.map_err(|e| SyncError::Walk {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            if !walked.file_type().is_file() {
                continue;
            }

            let relative = walked
                .path()
                .strip_prefix(dir)
                .map_err(|e| SyncError::Walk {
                    path: walked.path().to_path_buf(),
                    message: e.to_string(),
                })?;
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if let Some(matcher) = &matcher {
                if !matcher.is_match(&relative) {
                    continue;
                }
            }

            entries.push(UploadEntry {
                source: walked.path().to_path_buf(),
                key: ObjectKey::new(format!("{label}/{relative}"))?,
            });
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// Compile an eligibility glob into an anchored regex.
///
/// Supports `*` (within a segment), `?` (single character within a
/// segment), and `**` / `**/` (across segments). Everything else is
/// matched literally.
fn glob_to_regex(pattern: &str) -> Result<regex::Regex, SyncError> {
    let mut translated = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        // "**/" also matches zero directories
                        chars.next();
                        translated.push_str("(?:.*/)?");
                    } else {
                        translated.push_str(".*");
                    }
                } else {
                    translated.push_str("[^/]*");
                }
            }
            '?' => translated.push_str("[^/]"),
            c => translated.push_str(&regex::escape(&c.to_string())),
        }
    }

    translated.push('$');
    regex::Regex::new(&translated).map_err(|e| SyncError::Pattern(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawConfig;
    use crate::store::MockStore;

    fn config(custom_domain: Option<&str>, pattern: Option<&str>) -> PublishConfig {
        PublishConfig::resolve(
            RawConfig {
                repository: Some("acme/site".into()),
                custom_domain: custom_domain.map(str::to_string),
                pattern: pattern.map(str::to_string),
                ..RawConfig::default()
            },
            Some("tok".into()),
        )
        .unwrap()
    }

    fn publisher(config: &PublishConfig) -> (Publisher, MockStore) {
        let store = MockStore::new();
        (
            Publisher::new(config, Arc::new(store.clone())),
            store,
        )
    }

    mod urls {
        use super::*;

        #[test]
        fn default_url_follows_pages_convention() {
            let (publisher, _) = publisher(&config(None, None));
            assert_eq!(
                publisher.report_url("build123"),
                "https://acme.github.io/site/build123"
            );
        }

        #[test]
        fn custom_domain_wins_regardless_of_repository() {
            let (publisher, _) = publisher(&config(Some("regs.example.com"), None));
            assert_eq!(
                publisher.report_url("build123"),
                "https://regs.example.com/build123"
            );
        }
    }

    mod glob {
        use super::*;

        #[test]
        fn star_stays_within_a_segment() {
            let re = glob_to_regex("*.png").unwrap();
            assert!(re.is_match("a.png"));
            assert!(!re.is_match("dir/a.png"));
        }

        #[test]
        fn double_star_crosses_segments() {
            let re = glob_to_regex("**/*.png").unwrap();
            assert!(re.is_match("a.png"));
            assert!(re.is_match("dir/a.png"));
            assert!(re.is_match("dir/sub/a.png"));
            assert!(!re.is_match("dir/a.jpg"));
        }

        #[test]
        fn question_mark_matches_one_character() {
            let re = glob_to_regex("sample0?.png").unwrap();
            assert!(re.is_match("sample01.png"));
            assert!(!re.is_match("sample012.png"));
        }

        #[test]
        fn literals_are_escaped() {
            let re = glob_to_regex("a+b.png").unwrap();
            assert!(re.is_match("a+b.png"));
            assert!(!re.is_match("aab.png"));
        }
    }

    mod collect {
        use super::*;

        #[test]
        fn collects_keys_under_label_sorted() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("dir_a")).unwrap();
            std::fs::write(dir.path().join("dir_a/b.png"), b"b").unwrap();
            std::fs::write(dir.path().join("a.png"), b"a").unwrap();

            let (publisher, _) = publisher(&config(None, None));
            let entries = publisher.collect_uploads("build123", dir.path()).unwrap();

            let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
            assert_eq!(keys, vec!["build123/a.png", "build123/dir_a/b.png"]);
        }

        #[test]
        fn pattern_filters_candidates() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("a.png"), b"a").unwrap();
            std::fs::write(dir.path().join("notes.txt"), b"n").unwrap();

            let (publisher, _) = publisher(&config(None, Some("**/*.png")));
            let entries = publisher.collect_uploads("b1", dir.path()).unwrap();

            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].key.as_str(), "b1/a.png");
        }
    }
}
