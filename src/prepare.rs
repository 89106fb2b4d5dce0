//! prepare
//!
//! One-shot branch bootstrap for a new destination.
//!
//! A brand-new destination has no branch to clone, so before the first
//! publish run the branch is created as an orphan ref: a parentless
//! commit over the empty tree. The branch already existing is the
//! desired end state, not an error, so that case reports success.

use crate::api::{ApiError, GitHubClient};

/// Commit message for the bootstrap commit.
const BOOTSTRAP_MESSAGE: &str = "Initialize report branch";

/// Ensure the destination branch exists, creating it as an orphan ref
/// if needed.
///
/// Returns `true` when the branch was created by this call, `false`
/// when it already existed.
///
/// # Errors
///
/// Propagates any API failure other than the branch pre-existing.
pub async fn ensure_branch(client: &GitHubClient) -> Result<bool, ApiError> {
    match client.create_orphan_ref(BOOTSTRAP_MESSAGE).await {
        Ok(()) => Ok(true),
        Err(ApiError::RefAlreadyExists { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}
