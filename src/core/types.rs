//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`RepoCoordinate`] - Validated `owner/name` repository coordinate
//! - [`ObjectKey`] - Validated slash-delimited artifact key
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use regpages::core::types::{ObjectKey, RepoCoordinate};
//!
//! let coord = RepoCoordinate::parse("acme/site").unwrap();
//! assert_eq!(coord.owner, "acme");
//! assert_eq!(coord.name, "site");
//!
//! let key = ObjectKey::new("build123/sample.png").unwrap();
//! assert_eq!(key.as_str(), "build123/sample.png");
//!
//! // Invalid constructions fail at creation time
//! assert!(RepoCoordinate::parse("no-slash").is_err());
//! assert!(ObjectKey::new("../escape").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository coordinate: {0}")]
    InvalidRepository(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

/// A repository coordinate in `owner/name` form.
///
/// The coordinate identifies the destination repository on the hosting
/// service. Both components must be non-empty and the string must contain
/// exactly one `/`.
///
/// # Example
///
/// ```
/// use regpages::core::types::RepoCoordinate;
///
/// let coord = RepoCoordinate::parse("acme/site").unwrap();
/// assert_eq!(coord.to_string(), "acme/site");
///
/// assert!(RepoCoordinate::parse("acme").is_err());
/// assert!(RepoCoordinate::parse("acme/site/extra").is_err());
/// assert!(RepoCoordinate::parse("/site").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoCoordinate {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoCoordinate {
    /// Parse an `owner/name` coordinate string.
    ///
    /// Surrounding whitespace is trimmed, matching how configuration
    /// files tend to be written.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepository` when the string is not of
    /// the form `owner/name` with both parts non-empty.
    pub fn parse(coordinate: &str) -> Result<Self, TypeError> {
        let trimmed = coordinate.trim();
        let mut parts = trimmed.split('/');

        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(TypeError::InvalidRepository(format!(
                "expected 'owner/name', got '{trimmed}'"
            ))),
        }
    }
}

impl std::fmt::Display for RepoCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl TryFrom<String> for RepoCoordinate {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoCoordinate> for String {
    fn from(coord: RepoCoordinate) -> Self {
        coord.to_string()
    }
}

/// A validated artifact key.
///
/// Keys are slash-delimited relative paths inside the published tree.
/// Two keys are equal iff their strings are equal; keys map 1:1 to file
/// paths in the branch at commit time, so the validation rules exist to
/// keep that mapping safe:
///
/// - Cannot be empty
/// - Cannot start or end with `/`
/// - Cannot contain `\`, empty segments, or `.`/`..` segments
/// - Cannot contain ASCII control characters
///
/// # Example
///
/// ```
/// use regpages::core::types::ObjectKey;
///
/// let key = ObjectKey::new("build123/dir_a/sample01.png").unwrap();
/// assert_eq!(key.as_str(), "build123/dir_a/sample01.png");
///
/// assert!(ObjectKey::new("").is_err());
/// assert!(ObjectKey::new("/rooted").is_err());
/// assert!(ObjectKey::new("a//b").is_err());
/// assert!(ObjectKey::new("a/../b").is_err());
/// assert!(ObjectKey::new("back\\slash").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Create a new validated key.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidKey` when the key violates the rules above.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        Self::validate(&key)?;
        Ok(Self(key))
    }

    fn validate(key: &str) -> Result<(), TypeError> {
        if key.is_empty() {
            return Err(TypeError::InvalidKey("key cannot be empty".into()));
        }
        if key.starts_with('/') || key.ends_with('/') {
            return Err(TypeError::InvalidKey(format!(
                "key cannot start or end with '/': '{key}'"
            )));
        }
        if key.contains('\\') {
            return Err(TypeError::InvalidKey(format!(
                "key cannot contain '\\': '{key}'"
            )));
        }
        if key.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidKey(
                "key cannot contain control characters".into(),
            ));
        }
        for segment in key.split('/') {
            if segment.is_empty() {
                return Err(TypeError::InvalidKey(format!(
                    "key cannot contain empty segments: '{key}'"
                )));
            }
            if segment == "." || segment == ".." {
                return Err(TypeError::InvalidKey(format!(
                    "key cannot contain '.' or '..' segments: '{key}'"
                )));
            }
        }
        Ok(())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key's path below `prefix`, if it lives there.
    ///
    /// Returns `None` when the key is not under `prefix`. The prefix must
    /// end at a segment boundary; `"build12"` does not match
    /// `"build123/sample.png"`.
    ///
    /// # Example
    ///
    /// ```
    /// use regpages::core::types::ObjectKey;
    ///
    /// let key = ObjectKey::new("build123/sample.png").unwrap();
    /// assert_eq!(key.strip_prefix("build123"), Some("sample.png"));
    /// assert_eq!(key.strip_prefix("build12"), None);
    /// ```
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        let rest = self.0.strip_prefix(prefix)?;
        rest.strip_prefix('/')
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

/// Join an optional prefix and a relative path into one repository path.
///
/// Used when rooting keys under a configured path prefix.
///
/// # Example
///
/// ```
/// use regpages::core::types::join_under_prefix;
///
/// assert_eq!(join_under_prefix(Some("reports"), "build123"), "reports/build123");
/// assert_eq!(join_under_prefix(None, "build123"), "build123");
/// ```
pub fn join_under_prefix(prefix: Option<&str>, path: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}/{path}"),
        _ => path.to_string(),
    }
}
