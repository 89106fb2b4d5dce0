//! cli::commands::prepare
//!
//! Create the destination branch if it does not exist.

use anyhow::{Context as _, Result};

use crate::api::GitHubClient;
use crate::cli::Context;
use crate::prepare::ensure_branch;
use crate::ui::output;

/// Ensure the destination branch exists.
///
/// This is a synchronous wrapper that uses tokio to run the async
/// implementation.
pub fn prepare(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let client = GitHubClient::new(&config);

    let rt = tokio::runtime::Runtime::new()?;
    let created = rt
        .block_on(ensure_branch(&client))
        .with_context(|| format!("preparing branch '{}' on {}", config.branch, config.repository))?;

    if created {
        output::print(
            format!("created orphan branch '{}'", config.branch),
            ctx.verbosity,
        );
    } else {
        output::print(
            format!("branch '{}' already exists", config.branch),
            ctx.verbosity,
        );
    }
    Ok(())
}
