//! cli
//!
//! Command-line interface layer for regpages.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Resolve configuration (file + environment + flag overrides)
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::sync`] orchestrator; all remote interaction flows
//! through the store layer.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use anyhow::Result;

use crate::core::config::TOKEN_ENV;
use crate::core::{ConfigError, PublishConfig};
use crate::ui::Verbosity;

/// Per-invocation context assembled from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, when given.
    pub config: Option<PathBuf>,
    /// Repository coordinate override.
    pub repository: Option<String>,
    /// Branch override.
    pub branch: Option<String>,
    /// Output verbosity.
    pub verbosity: Verbosity,
}

impl Context {
    /// Load and resolve the configuration with flag overrides applied.
    pub fn load_config(&self) -> Result<PublishConfig, ConfigError> {
        let mut raw = PublishConfig::load_raw(self.config.as_deref())?;
        if let Some(repository) = &self.repository {
            raw.repository = Some(repository.clone());
        }
        if let Some(branch) = &self.branch {
            raw.branch = Some(branch.clone());
        }
        PublishConfig::resolve(raw, std::env::var(TOKEN_ENV).ok())
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = Context {
        config: cli.config.clone(),
        repository: cli.repository.clone(),
        branch: cli.branch.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}
