//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves configuration
//! 2. Calls the sync/prepare layer to execute
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Everything that touches the remote is async. Handlers are synchronous
//! wrappers that own a tokio `Runtime` and `block_on` the async body.

mod fetch;
mod prepare;
mod publish;

pub use fetch::fetch;
pub use prepare::prepare;
pub use publish::publish;

use anyhow::Result;

use super::{Command, Context};

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Publish { dir, label } => publish(ctx, &dir, &label),
        Command::Fetch { dir, label } => fetch(ctx, &dir, &label),
        Command::Prepare => prepare(ctx),
    }
}
