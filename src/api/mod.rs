//! api
//!
//! Hosted repository API access.
//!
//! # Architecture
//!
//! The [`client::GitHubClient`] is the only doorway to the hosted API.
//! It serves the read path of the store (listing and download-URL
//! resolution) and the bootstrap path (orphan-ref creation); the write
//! path is git transport, owned by [`crate::git`].

pub mod client;

pub use client::{ApiError, ContentEntry, GitHubClient, UserIdentity, EMPTY_TREE_OID};
