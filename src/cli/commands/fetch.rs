//! cli::commands::fetch
//!
//! Fetch a published batch into a directory.

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::sync::Publisher;
use crate::ui::output;

/// Fetch everything stored under `label` into `dir`.
///
/// This is a synchronous wrapper that uses tokio to run the async
/// implementation.
pub fn fetch(ctx: &Context, dir: &Path, label: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let publisher = Publisher::from_config(&config);

    let rt = tokio::runtime::Runtime::new()?;
    let results = rt
        .block_on(publisher.fetch(label, dir))
        .with_context(|| format!("fetching '{label}' from {}", config.repository))?;

    if results.is_empty() {
        output::warn(format!("nothing stored under '{label}'"), ctx.verbosity);
    } else {
        output::print(
            format!("fetched {} files into '{}'", results.len(), dir.display()),
            ctx.verbosity,
        );
    }
    Ok(())
}
