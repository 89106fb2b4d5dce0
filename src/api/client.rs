//! api::client
//!
//! GitHub repository API client.
//!
//! # Design
//!
//! This module is the read path (and ref-bootstrap path) of the store:
//! a thin authenticated wrapper over the hosted contents / git-refs /
//! git-commits / user endpoints. All remote reads go through the API
//! rather than through git transport because the API exposes lightweight
//! per-path listing without a tree walk of a cloned repository. The
//! write path (commit + push) lives in [`crate::git`] instead; the two
//! are composed by [`crate::store`].
//!
//! # Authentication
//!
//! A static bearer token bound at construction. 401/403 responses are
//! surfaced as [`ApiError::AuthFailed`] with the API's message attached;
//! there is no refresh or retry.
//!
//! # Example
//!
//! ```ignore
//! use regpages::api::GitHubClient;
//!
//! let client = GitHubClient::new(&config);
//! let entries = client.list_dir("reports/build123").await?;
//! for entry in entries {
//!     println!("{}", entry.path);
//! }
//! ```

use std::path::Path;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::PublishConfig;

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "regpages";

/// The well-known hash of git's empty tree. An orphan branch is a
/// parentless commit pointing at this tree.
pub const EMPTY_TREE_OID: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Errors from repository API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A listing prefix resolved to a single file instead of a directory.
    #[error("'{path}' must be a directory")]
    NotADirectory {
        /// The offending remote path
        path: String,
    },

    /// A download path resolved to a directory or carries no content.
    #[error("'{path}' must be a downloadable file")]
    NotAFile {
        /// The offending remote path
        path: String,
    },

    /// The branch ref already exists (bootstrap-only condition).
    #[error("branch '{branch}' already exists")]
    RefAlreadyExists {
        /// The branch that was being created
        branch: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an unexpected error status.
    #[error("API error: {status} - {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// Local filesystem error while materializing a download.
    #[error("failed to write '{path}': {source}")]
    Io {
        /// The local destination path
        path: std::path::PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

/// The authenticated identity behind the configured token.
///
/// Used to attribute commits when no local git identity is supplied.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct UserIdentity {
    /// Account login name.
    pub login: String,
    /// Public email, when the account exposes one.
    pub email: Option<String>,
}

impl UserIdentity {
    /// The email to attribute commits to, falling back to the
    /// conventional no-reply form when the account has none.
    pub fn commit_email(&self) -> String {
        match &self.email {
            Some(email) => email.clone(),
            None => format!("{}@users.noreply.github.com", self.login),
        }
    }
}

/// One entry of a contents listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    /// Entry name (final path segment).
    pub name: String,
    /// Full path within the branch tree.
    pub path: String,
    /// Entry kind as reported by the API (`file`, `dir`, `symlink`, ...).
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Content-addressed fetch URL; absent for directories.
    pub download_url: Option<String>,
}

impl ContentEntry {
    /// Whether this entry is an ordinary file.
    pub fn is_file(&self) -> bool {
        self.entry_type == "file"
    }
}

/// GitHub repository API client.
///
/// Bound to one repository coordinate and branch at construction; the
/// configuration is copied in, never read from ambient state, so several
/// clients for different destinations can coexist in one process.
pub struct GitHubClient {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// Destination branch
    branch: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubClient {
    /// Create a client for the configured destination.
    pub fn new(config: &PublishConfig) -> Self {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Create a client with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations or test servers.
    pub fn with_api_base(config: &PublishConfig, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: config.token.clone(),
            owner: config.repository.owner.clone(),
            repo: config.repository.name.clone(),
            branch: config.branch.clone(),
            api_base: api_base.into(),
        }
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Get the destination branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Build common headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .unwrap_or_else(|_| HeaderValue::from_static("Bearer invalid")),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ApiError::Status {
                status: status.as_u16(),
                message: format!("failed to parse response: {}", e),
            })
        } else {
            Err(self.handle_error_response(response, status).await)
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response(&self, response: Response, status: StatusCode) -> ApiError {
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ApiError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN => ApiError::AuthFailed(format!("permission denied: {message}")),
            StatusCode::NOT_FOUND => ApiError::NotFound(format!(
                "{message} ({}/{} at {})",
                self.owner, self.repo, self.branch
            )),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    // =========================================================================
    // Contents (read path)
    // =========================================================================

    /// List the entries directly under `path` on the configured branch.
    ///
    /// An absent path (or absent branch) returns an **empty** listing:
    /// absence of content is the expected steady state for a brand-new
    /// destination, not a failure.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotADirectory`] when `path` resolves to a single file
    pub async fn list_dir(&self, path: &str) -> Result<Vec<ContentEntry>, ApiError> {
        let url = format!("{}?ref={}", self.repo_url(&format!("contents/{path}")), self.branch);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let contents: ContentsResponse = self.handle_response(response).await?;
        match contents {
            ContentsResponse::Listing(entries) => Ok(entries),
            ContentsResponse::Single(_) => Err(ApiError::NotADirectory {
                path: path.to_string(),
            }),
        }
    }

    /// Resolve the content-addressed download URL for one file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::NotAFile`] when `path` is a directory or has no
    ///   fetchable content
    /// - [`ApiError::NotFound`] when `path` does not exist
    pub async fn download_url(&self, path: &str) -> Result<String, ApiError> {
        let url = format!("{}?ref={}", self.repo_url(&format!("contents/{path}")), self.branch);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let contents: ContentsResponse = self.handle_response(response).await?;
        match contents {
            ContentsResponse::Single(entry) if entry.is_file() => {
                entry.download_url.ok_or_else(|| ApiError::NotAFile {
                    path: path.to_string(),
                })
            }
            _ => Err(ApiError::NotAFile {
                path: path.to_string(),
            }),
        }
    }

    /// Stream a download URL into `dest`, returning the content type.
    ///
    /// The URL comes from [`download_url`](Self::download_url) and is
    /// already content-addressed, so no auth headers are attached. A
    /// response without a `Content-Type` reports `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Status`] on a non-success response
    /// - [`ApiError::Io`] on a local write failure
    pub async fn download_to(&self, url: &str, dest: &Path) -> Result<String, ApiError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: format!("download of '{url}' failed"),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ApiError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| ApiError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?
        {
            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
                .await
                .map_err(|source| ApiError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
        }

        Ok(content_type)
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Get the authenticated user behind the configured token.
    pub async fn current_user(&self) -> Result<UserIdentity, ApiError> {
        let url = format!("{}/user", self.api_base);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        self.handle_response(response).await
    }

    // =========================================================================
    // Refs (bootstrap + test administration)
    // =========================================================================

    /// Create the configured branch as an orphan ref: a parentless commit
    /// whose tree is the well-known empty tree.
    ///
    /// # Errors
    ///
    /// - [`ApiError::RefAlreadyExists`] when the branch is already present;
    ///   bootstrap callers treat that as success
    pub async fn create_orphan_ref(&self, message: &str) -> Result<(), ApiError> {
        // A commit with no parents over the empty tree...
        let commit_url = self.repo_url("git/commits");
        let commit_body = CreateCommitBody {
            message,
            tree: EMPTY_TREE_OID,
            parents: Vec::new(),
        };

        let response = self
            .client
            .post(&commit_url)
            .headers(self.headers())
            .json(&commit_body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let commit: CreateCommitResponse = self.handle_response(response).await?;

        // ...and a branch ref pointing at it.
        let ref_url = self.repo_url("git/refs");
        let ref_body = CreateRefBody {
            ref_name: format!("refs/heads/{}", self.branch),
            sha: &commit.sha,
        };

        let response = self
            .client
            .post(&ref_url)
            .headers(self.headers())
            .json(&ref_body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ApiError::RefAlreadyExists {
                branch: self.branch.clone(),
            });
        }
        if !status.is_success() {
            return Err(self.handle_error_response(response, status).await);
        }

        Ok(())
    }

    /// Delete the configured branch ref.
    ///
    /// Administrative operation used by test harnesses; not part of the
    /// steady-state publish/fetch protocol.
    pub async fn delete_ref(&self) -> Result<(), ApiError> {
        let url = self.repo_url(&format!("git/refs/heads/{}", self.branch));

        let response = self
            .client
            .delete(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(response, status).await);
        }

        Ok(())
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// GitHub API error body.
#[derive(Debug, Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// The contents endpoint returns an array for directories and a single
/// object for files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    Single(ContentEntry),
}

#[derive(Debug, Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateCommitResponse {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RawConfig;

    fn test_config() -> PublishConfig {
        PublishConfig::resolve(
            RawConfig {
                repository: Some("acme/site".into()),
                ..RawConfig::default()
            },
            Some("test_token".into()),
        )
        .unwrap()
    }

    #[test]
    fn new_binds_coordinate_and_branch() {
        let client = GitHubClient::new(&test_config());
        assert_eq!(client.owner(), "acme");
        assert_eq!(client.repo(), "site");
        assert_eq!(client.branch(), "gh-pages");
    }

    #[test]
    fn repo_url_builds_repository_endpoints() {
        let client = GitHubClient::new(&test_config());
        assert_eq!(
            client.repo_url("contents/reports"),
            "https://api.github.com/repos/acme/site/contents/reports"
        );
    }

    #[test]
    fn with_api_base_overrides_host() {
        let client = GitHubClient::with_api_base(&test_config(), "http://127.0.0.1:9999");
        assert_eq!(
            client.repo_url("git/refs"),
            "http://127.0.0.1:9999/repos/acme/site/git/refs"
        );
    }

    #[test]
    fn debug_does_not_expose_token() {
        let client = GitHubClient::new(&test_config());
        let debug_output = format!("{:?}", client);
        assert!(!debug_output.contains("test_token"));
        assert!(debug_output.contains("acme"));
    }

    mod user_identity {
        use super::*;

        #[test]
        fn commit_email_uses_public_email() {
            let identity = UserIdentity {
                login: "octocat".into(),
                email: Some("octo@example.com".into()),
            };
            assert_eq!(identity.commit_email(), "octo@example.com");
        }

        #[test]
        fn commit_email_falls_back_to_noreply() {
            let identity = UserIdentity {
                login: "octocat".into(),
                email: None,
            };
            assert_eq!(identity.commit_email(), "octocat@users.noreply.github.com");
        }

        #[test]
        fn deserializes_null_email() {
            let identity: UserIdentity =
                serde_json::from_str(r#"{"login": "octocat", "email": null}"#).unwrap();
            assert_eq!(identity.login, "octocat");
            assert!(identity.email.is_none());
        }
    }

    mod wire_shapes {
        use super::*;

        #[test]
        fn directory_listing_parses_as_array() {
            let json = r#"[
                {"name": "a.png", "path": "reports/b1/a.png", "type": "file",
                 "download_url": "https://raw.example.com/a.png"},
                {"name": "sub", "path": "reports/b1/sub", "type": "dir",
                 "download_url": null}
            ]"#;
            let contents: ContentsResponse = serde_json::from_str(json).unwrap();
            match contents {
                ContentsResponse::Listing(entries) => {
                    assert_eq!(entries.len(), 2);
                    assert!(entries[0].is_file());
                    assert!(!entries[1].is_file());
                }
                ContentsResponse::Single(_) => panic!("expected a listing"),
            }
        }

        #[test]
        fn file_response_parses_as_single() {
            let json = r#"{"name": "a.png", "path": "reports/a.png", "type": "file",
                           "download_url": "https://raw.example.com/a.png"}"#;
            let contents: ContentsResponse = serde_json::from_str(json).unwrap();
            assert!(matches!(contents, ContentsResponse::Single(_)));
        }

        #[test]
        fn create_ref_body_renames_ref_field() {
            let body = CreateRefBody {
                ref_name: "refs/heads/gh-pages".into(),
                sha: "abc",
            };
            let json = serde_json::to_string(&body).unwrap();
            assert!(json.contains("\"ref\":\"refs/heads/gh-pages\""));
        }

        #[test]
        fn create_commit_body_has_empty_parents() {
            let body = CreateCommitBody {
                message: "Initialize report branch",
                tree: EMPTY_TREE_OID,
                parents: Vec::new(),
            };
            let json = serde_json::to_string(&body).unwrap();
            assert!(json.contains("\"parents\":[]"));
            assert!(json.contains(EMPTY_TREE_OID));
        }
    }
}
