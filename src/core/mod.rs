//! core
//!
//! Domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types (`RepoCoordinate`, `ObjectKey`)
//! - [`config`] - Configuration schema, loading, and validation
//!
//! # Design
//!
//! Everything the rest of the crate needs to know about a publish
//! destination is captured here once, validated, and then passed into
//! component constructors by reference. No component reads configuration
//! from ambient state, which keeps several destinations safe to drive
//! from one process.

pub mod config;
pub mod types;

pub use config::{ConfigError, PublishConfig, RawConfig};
pub use types::{join_under_prefix, ObjectKey, RepoCoordinate, TypeError};
