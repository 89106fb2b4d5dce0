//! cli::commands::publish
//!
//! Publish a report directory as one batch.

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::sync::Publisher;
use crate::ui::output;

/// Publish `dir` under `label` and print the report URL.
///
/// This is a synchronous wrapper that uses tokio to run the async
/// implementation.
pub fn publish(ctx: &Context, dir: &Path, label: &str) -> Result<()> {
    let config = ctx.load_config()?;
    let publisher = Publisher::from_config(&config);

    let entries = publisher
        .collect_uploads(label, dir)
        .with_context(|| format!("collecting upload candidates from '{}'", dir.display()))?;

    output::debug(
        format!(
            "staging {} files for {}@{}",
            entries.len(),
            config.repository,
            config.branch
        ),
        ctx.verbosity,
    );

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt
        .block_on(publisher.publish(label, &entries))
        .with_context(|| format!("publishing '{label}' to {}", config.repository))?;

    output::print(
        format!("published {} files", report.uploaded),
        ctx.verbosity,
    );
    // The URL is the command's result; print it even in quiet mode.
    println!("{}", report.report_url);
    Ok(())
}
