//! git::staging
//!
//! Local staging clone for batched branch writes.
//!
//! This module is the **single doorway** to git transport in regpages.
//! No other module imports `git2`. It implements the write path of the
//! store: acquire a disposable clone of the destination branch, stage
//! files into its index, then flush everything with exactly one commit
//! and one push.
//!
//! # The no-checkout clone
//!
//! A publish run typically touches a small subset of a branch that may
//! hold many earlier reports, so the clone is shallow (depth 1), fetches
//! only the destination branch, skips tags, and never checks out files.
//! Because no checkout happens, the index must still be reconciled
//! against the fetched tree so that later staging sees correct base
//! state; `acquire` does this by reading the fetched commit's tree into
//! the index right after the fetch.
//!
//! # Failure semantics
//!
//! Nothing here is retried. Clone, stage, and commit/push failures abort
//! the run; the staging directory is temporary and dropped with the
//! [`StagingArea`], so a failed run never contaminates the next and
//! never mutates the remote.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;

/// Errors from staging operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The remote branch does not exist; branch bootstrap must run first.
    #[error("remote branch not found: {branch}")]
    BranchNotFound {
        /// The branch that was requested
        branch: String,
    },

    /// A staging source file is missing or unreadable.
    #[error("cannot stage '{path}': {message}")]
    MissingSource {
        /// The source path that failed
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// The push was rejected by the remote (non-fast-forward).
    ///
    /// This surfaces a concurrent writer having advanced the branch.
    /// There is no retry or rebase; the caller decides what to do.
    #[error("push of '{branch}' rejected by remote: {reason}")]
    PushRejected {
        /// The branch being pushed
        branch: String,
        /// The remote's stated reason
        reason: String,
    },

    /// Local filesystem error.
    #[error("staging I/O error at '{path}': {source}")]
    Io {
        /// The path involved
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Internal git error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        GitError::Internal {
            message: format!("{}: {}", context, err.message()),
        }
    }
}

/// Identity to attribute the batch commit to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    /// Author/committer name.
    pub name: String,
    /// Author/committer email.
    pub email: String,
}

/// An ephemeral, non-checked-out clone of the destination branch.
///
/// Owned exclusively by one publish run: created fresh by
/// [`StagingArea::acquire`], mutated through [`stage`](StagingArea::stage)
/// calls, flushed once by [`commit_and_push`](StagingArea::commit_and_push),
/// and discarded on drop. The git index is the accumulation point for
/// staged files; a batch is never partially pushed.
pub struct StagingArea {
    /// The underlying git2 repository
    repo: git2::Repository,
    /// Temp directory owning the clone; removed on drop
    dir: TempDir,
    /// The destination branch
    branch: String,
    /// Remote URL the clone was acquired from
    remote_url: String,
    /// Token for authenticated transport, when the remote needs one
    token: Option<String>,
    /// Number of files staged so far
    staged: usize,
}

impl std::fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingArea")
            .field("path", &self.dir.path())
            .field("branch", &self.branch)
            .field("staged", &self.staged)
            .finish()
    }
}

impl StagingArea {
    /// Acquire a staging clone of `branch` at `remote_url`.
    ///
    /// Performs a shallow (depth 1), single-branch, tagless fetch into a
    /// fresh temporary repository without checking out files, then
    /// reconciles the index against the fetched tree.
    ///
    /// # Errors
    ///
    /// - [`GitError::BranchNotFound`] when the remote branch does not
    ///   exist (run branch bootstrap first)
    pub fn acquire(
        remote_url: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<Self, GitError> {
        let dir = TempDir::new().map_err(|source| GitError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        let repo = git2::Repository::init(dir.path())
            .map_err(|e| GitError::from_git2(e, "init staging repository"))?;

        {
            let mut remote = repo
                .remote("origin", remote_url)
                .map_err(|e| GitError::from_git2(e, "add remote"))?;

            let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");

            let mut options = git2::FetchOptions::new();
            options.remote_callbacks(transport_callbacks(token));
            options.download_tags(git2::AutotagOption::None);
            options.depth(1);

            let fetched = remote.fetch(&[refspec.as_str()], Some(&mut options), None);
            let fetched = match fetched {
                // Not every transport implements shallow negotiation
                // (local-path remotes in particular); destinations are
                // flat output trees, so a full fetch is an acceptable
                // substitute there.
                Err(e) if e.message().contains("shallow") => {
                    let mut full = git2::FetchOptions::new();
                    full.remote_callbacks(transport_callbacks(token));
                    full.download_tags(git2::AutotagOption::None);
                    remote.fetch(&[refspec.as_str()], Some(&mut full), None)
                }
                other => other,
            };

            fetched.map_err(|e| {
                // Transports disagree on how a missing branch surfaces:
                // some report ENOTFOUND, some an unmatched refspec.
                if e.code() == git2::ErrorCode::NotFound || e.message().contains("refspec") {
                    GitError::BranchNotFound {
                        branch: branch.to_string(),
                    }
                } else {
                    GitError::from_git2(e, &format!("fetch '{branch}' from '{remote_url}'"))
                }
            })?;
        }

        let tracking = format!("refs/remotes/origin/{branch}");
        let commit = match repo.find_reference(&tracking) {
            Ok(reference) => reference
                .peel_to_commit()
                .map_err(|e| GitError::from_git2(e, &tracking))?,
            // Some transports report a missing source refspec as a
            // successful no-op fetch; the absent tracking ref is the
            // reliable signal either way.
            Err(_) => {
                return Err(GitError::BranchNotFound {
                    branch: branch.to_string(),
                })
            }
        };

        let local_ref = format!("refs/heads/{branch}");
        repo.reference(&local_ref, commit.id(), true, "regpages: acquire")
            .map_err(|e| GitError::from_git2(e, &local_ref))?;
        repo.set_head(&local_ref)
            .map_err(|e| GitError::from_git2(e, &local_ref))?;

        // Reconcile the index with the fetched tree so staging diffs
        // against the remote's state even though nothing was checked out.
        let tree = commit
            .tree()
            .map_err(|e| GitError::from_git2(e, "resolve fetched tree"))?;
        let mut index = repo
            .index()
            .map_err(|e| GitError::from_git2(e, "open index"))?;
        index
            .read_tree(&tree)
            .map_err(|e| GitError::from_git2(e, "reconcile index"))?;
        index
            .write()
            .map_err(|e| GitError::from_git2(e, "write index"))?;
        drop(tree);
        drop(commit);

        Ok(Self {
            repo,
            dir,
            branch: branch.to_string(),
            remote_url: remote_url.to_string(),
            token: token.map(str::to_string),
            staged: 0,
        })
    }

    /// The on-disk location of the staging clone.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The branch this area will push to.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Number of files staged so far.
    pub fn staged_count(&self) -> usize {
        self.staged
    }

    /// Copy `source` into the clone at `repo_relative` and record it in
    /// the index.
    ///
    /// Intermediate directories are created as needed. Calls for
    /// distinct destination paths are independent; the index and the
    /// filesystem only ever grow during a run.
    ///
    /// # Errors
    ///
    /// - [`GitError::MissingSource`] when `source` does not exist
    /// - [`GitError::Io`] when the destination cannot be written
    pub fn stage(&mut self, source: &Path, repo_relative: &str) -> Result<(), GitError> {
        if !source.is_file() {
            return Err(GitError::MissingSource {
                path: source.to_path_buf(),
                message: "no such file".into(),
            });
        }

        let workdir = self.repo.workdir().ok_or_else(|| GitError::Internal {
            message: "staging repository has no work directory".into(),
        })?;
        let dest = workdir.join(repo_relative);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| GitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(source, &dest).map_err(|source| GitError::Io {
            path: dest.clone(),
            source,
        })?;

        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "open index"))?;
        index
            .add_path(Path::new(repo_relative))
            .map_err(|e| GitError::from_git2(e, repo_relative))?;
        index
            .write()
            .map_err(|e| GitError::from_git2(e, "write index"))?;

        self.staged += 1;
        Ok(())
    }

    /// Create exactly one commit over everything staged and push it.
    ///
    /// The commit is authored and committed as `identity`. An empty
    /// batch still commits. This is the single point of remote mutation
    /// in the whole crate.
    ///
    /// # Errors
    ///
    /// - [`GitError::PushRejected`] when the remote refuses the ref
    ///   update (a concurrent writer advanced the branch); nothing is
    ///   retried and the remote is left exactly as the winner wrote it
    pub fn commit_and_push(
        &mut self,
        message: &str,
        identity: &CommitIdentity,
    ) -> Result<(), GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "open index"))?;
        let tree_oid = index
            .write_tree()
            .map_err(|e| GitError::from_git2(e, "write tree"))?;
        let tree = self
            .repo
            .find_tree(tree_oid)
            .map_err(|e| GitError::from_git2(e, "find tree"))?;

        let signature = git2::Signature::now(&identity.name, &identity.email)
            .map_err(|e| GitError::from_git2(e, "build signature"))?;

        let parent = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "resolve HEAD"))?;

        self.repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &[&parent],
            )
            .map_err(|e| GitError::from_git2(e, "create commit"))?;

        self.push()
    }

    /// Push the local branch to the remote.
    fn push(&self) -> Result<(), GitError> {
        let mut remote = self
            .repo
            .find_remote("origin")
            .map_err(|e| GitError::from_git2(e, "find remote"))?;

        // The remote reports per-ref rejection through a callback rather
        // than the push result.
        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let mut callbacks = transport_callbacks(self.token.as_deref());
        callbacks.push_update_reference(|_refname, status| {
            if let Some(reason) = status {
                *rejection.borrow_mut() = Some(reason.to_string());
            }
            Ok(())
        });

        let mut options = git2::PushOptions::new();
        options.remote_callbacks(callbacks);

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", self.branch);
        let pushed = remote.push(&[refspec.as_str()], Some(&mut options));

        if let Some(reason) = rejection.borrow_mut().take() {
            return Err(GitError::PushRejected {
                branch: self.branch.clone(),
                reason,
            });
        }

        pushed.map_err(|e| {
            let message = e.message().to_string();
            let lowered = message.to_lowercase();
            // Depending on the transport, non-fast-forward shows up as
            // "cannot push non-fastforwardable reference" or a rejection
            // in the error itself rather than the callback.
            if lowered.contains("fastforward") || lowered.contains("fast-forward") || lowered.contains("rejected") {
                GitError::PushRejected {
                    branch: self.branch.clone(),
                    reason: message,
                }
            } else {
                GitError::from_git2(e, &format!("push '{}' to '{}'", self.branch, self.remote_url))
            }
        })
    }
}

/// Remote callbacks carrying token credentials, when a token is present.
///
/// The token is presented as a password over HTTPS, the transport form
/// the hosted API expects. Local-path remotes (tests) never invoke the
/// credential callback.
fn transport_callbacks<'cb>(token: Option<&str>) -> git2::RemoteCallbacks<'cb> {
    let mut callbacks = git2::RemoteCallbacks::new();
    if let Some(token) = token {
        let token = token.to_string();
        callbacks.credentials(move |_url, username, _allowed| {
            git2::Cred::userpass_plaintext(username.unwrap_or("x-access-token"), &token)
        });
    }
    callbacks
}
