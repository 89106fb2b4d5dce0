//! store
//!
//! The artifact store over a git branch.
//!
//! # Architecture
//!
//! The [`ArtifactStore`] trait is the capability contract the external
//! diffing engine (and our own orchestrator) drives: `list_items`,
//! `download_item`, buffered `upload_item`, and the `begin_batch` /
//! `commit_batch` boundaries. [`BranchStore`] implements it over the
//! hosted API (reads) plus a local staging clone (writes); [`MockStore`]
//! implements it in memory for deterministic tests.
//!
//! # Modules
//!
//! - `traits`: the `ArtifactStore` trait, listing/download value types,
//!   and `StoreError`
//! - [`branch`]: the production implementation
//! - [`mock`]: the test double

pub mod branch;
pub mod mock;
mod traits;

pub use branch::BranchStore;
pub use mock::{FailOn, MockOperation, MockStore};
pub use traits::{ArtifactStore, DownloadResult, RemoteListing, StoreError};
