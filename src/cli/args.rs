//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Use this config file
//! - `--repository <owner/name>`: Override the destination repository
//! - `--branch <name>`: Override the destination branch
//! - `--debug`: Enable debug output
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// regpages - Publish visual-regression reports through a GitHub Pages branch
#[derive(Parser, Debug)]
#[command(name = "regpages")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use this config file instead of the default search order
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Destination repository as 'owner/name' (overrides config)
    #[arg(long, global = true)]
    pub repository: Option<String>,

    /// Destination branch (overrides config)
    #[arg(long, global = true)]
    pub branch: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish a report directory as one batch
    #[command(
        long_about = "Publish a report directory as one batch.\n\n\
            Walks the directory, keys every eligible file under the batch \
            label, stages everything into a fresh shallow clone of the \
            destination branch, and lands the whole batch as a single \
            commit and push. Prints the report URL on success."
    )]
    Publish {
        /// Directory holding the generated report
        dir: PathBuf,

        /// Batch label the report is keyed under (e.g. a commit hash)
        #[arg(long)]
        label: String,
    },

    /// Fetch a published batch into a directory
    #[command(
        long_about = "Fetch a published batch into a directory.\n\n\
            Lists everything stored under the batch label and downloads \
            it, preserving paths. Read-only against the remote."
    )]
    Fetch {
        /// Directory to materialize the batch into
        dir: PathBuf,

        /// Batch label to fetch
        #[arg(long)]
        label: String,
    },

    /// Create the destination branch if it does not exist
    #[command(
        long_about = "Create the destination branch if it does not exist.\n\n\
            The branch is created as an orphan ref over the empty tree. \
            Running this against an existing branch is a no-op."
    )]
    Prepare,
}
