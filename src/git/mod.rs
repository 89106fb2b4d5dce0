//! git
//!
//! Local git transport for batched branch writes.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to git. No other module imports
//! `git2`. We use the `git2` crate exclusively (no shelling out to the
//! git CLI).
//!
//! # Responsibilities
//!
//! - Shallow, single-branch, no-checkout acquisition of a staging clone
//! - Staging files into the clone's index
//! - The single commit + push that flushes a batch
//!
//! # Invariants
//!
//! - One staging area per publish run; never reused across runs
//! - One commit and one push per staging area lifetime
//! - A rejected push leaves the remote untouched and is never retried

mod staging;

pub use staging::{CommitIdentity, GitError, StagingArea};
