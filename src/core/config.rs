//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! One publish destination is described by a [`PublishConfig`]: the
//! repository coordinate, branch, access token, and the optional knobs
//! (eligibility pattern, custom domain, path prefix). The config is built
//! once per run and passed by reference into each component constructor;
//! nothing reads it from ambient state.
//!
//! # File Locations
//!
//! Searched in order:
//! 1. `--config <path>` if given
//! 2. `$REGPAGES_CONFIG` if set
//! 3. `.regpages.toml` in the working directory
//! 4. `~/.config/regpages/config.toml`
//!
//! # Token Resolution
//!
//! The access token may be set in the file (`token = "..."`) or supplied
//! through `$GITHUB_TOKEN`; the environment wins so tokens can stay out of
//! committed files.
//!
//! # Example
//!
//! ```toml
//! repository = "acme/site"
//! branch = "gh-pages"
//! pattern = "**/*.png"
//! custom_domain = "regs.example.com"
//! path_prefix = "reports"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{RepoCoordinate, TypeError};

/// Branch used when the config does not name one.
pub const DEFAULT_BRANCH: &str = "gh-pages";

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "REGPAGES_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid repository coordinate: {0}")]
    InvalidRepository(String),

    #[error("no access token: set {TOKEN_ENV} or the 'token' config field")]
    MissingToken,

    #[error("no repository configured: set 'repository' in the config file or pass --repository")]
    MissingRepository,

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl From<TypeError> for ConfigError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidRepository(message) => ConfigError::InvalidRepository(message),
            other => ConfigError::InvalidValue(other.to_string()),
        }
    }
}

/// On-disk configuration shape.
///
/// All fields are optional at the file level; [`PublishConfig::resolve`]
/// applies defaults and enforces what is actually required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// Destination repository as `owner/name`.
    pub repository: Option<String>,

    /// Destination branch (default: `gh-pages`).
    pub branch: Option<String>,

    /// Access token. Usually left unset in favor of `$GITHUB_TOKEN`.
    pub token: Option<String>,

    /// Glob restricting which local files are eligible for upload.
    pub pattern: Option<String>,

    /// Custom public hostname for report URLs.
    pub custom_domain: Option<String>,

    /// Path prefix under which all keys are rooted in the branch.
    pub path_prefix: Option<String>,
}

impl RawConfig {
    /// Load the raw config from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ReadError`/`ParseError` naming the offending file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Resolved configuration for one publish destination.
///
/// Immutable for the lifetime of a run. Constructed through
/// [`PublishConfig::resolve`] so that every instance has passed
/// validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    /// Destination repository.
    pub repository: RepoCoordinate,
    /// Destination branch.
    pub branch: String,
    /// Access token for the hosted API and for pushes.
    pub token: String,
    /// Glob restricting which local files are eligible for upload.
    pub pattern: Option<String>,
    /// Custom public hostname for report URLs.
    pub custom_domain: Option<String>,
    /// Path prefix under which all keys are rooted.
    pub path_prefix: Option<String>,
}

impl PublishConfig {
    /// Resolve a raw config into a validated one.
    ///
    /// `env_token` is the value of `$GITHUB_TOKEN` (if any); it takes
    /// precedence over the file's `token` field.
    ///
    /// # Errors
    ///
    /// - `MissingRepository` when no repository coordinate is present
    /// - `InvalidRepository` when the coordinate is malformed
    /// - `MissingToken` when neither source supplies a token
    /// - `InvalidValue` for an empty branch or path prefix with slashes
    ///   at either end
    pub fn resolve(raw: RawConfig, env_token: Option<String>) -> Result<Self, ConfigError> {
        let repository = raw.repository.ok_or(ConfigError::MissingRepository)?;
        let repository = RepoCoordinate::parse(&repository)?;

        let branch = raw.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string());
        if branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue("branch cannot be empty".into()));
        }

        let token = env_token
            .filter(|t| !t.is_empty())
            .or(raw.token)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        if let Some(prefix) = &raw.path_prefix {
            if prefix.starts_with('/') || prefix.ends_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "path_prefix cannot start or end with '/': '{prefix}'"
                )));
            }
        }

        Ok(Self {
            repository,
            branch,
            token,
            pattern: raw.pattern,
            custom_domain: raw.custom_domain,
            path_prefix: raw.path_prefix.filter(|p| !p.is_empty()),
        })
    }

    /// Load configuration from the default locations.
    ///
    /// `explicit` is the `--config` flag value; when set, that file must
    /// exist. Otherwise the search order documented on the module applies,
    /// and a missing file is only an error if the environment cannot
    /// supply the repository either.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve(Self::load_raw(explicit)?, std::env::var(TOKEN_ENV).ok())
    }

    /// Load the raw (unresolved) config, for callers that layer CLI-flag
    /// overrides on top before resolving.
    pub fn load_raw(explicit: Option<&Path>) -> Result<RawConfig, ConfigError> {
        match Self::locate(explicit) {
            Some(path) => RawConfig::from_file(&path),
            None => Ok(RawConfig::default()),
        }
    }

    /// Find the config file to load, if any.
    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        let local = PathBuf::from(".regpages.toml");
        if local.exists() {
            return Some(local);
        }
        let global = dirs::config_dir()?.join("regpages").join("config.toml");
        if global.exists() {
            return Some(global);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw(repository: &str) -> RawConfig {
        RawConfig {
            repository: Some(repository.to_string()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn resolve_applies_defaults() {
        let config = PublishConfig::resolve(raw("acme/site"), Some("tok".into())).unwrap();
        assert_eq!(config.repository.to_string(), "acme/site");
        assert_eq!(config.branch, DEFAULT_BRANCH);
        assert_eq!(config.token, "tok");
        assert!(config.pattern.is_none());
        assert!(config.custom_domain.is_none());
        assert!(config.path_prefix.is_none());
    }

    #[test]
    fn resolve_requires_repository() {
        let err = PublishConfig::resolve(RawConfig::default(), Some("tok".into())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRepository));
    }

    #[test]
    fn resolve_rejects_malformed_repository() {
        let err = PublishConfig::resolve(raw("not-a-coordinate"), Some("tok".into())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository(_)));
    }

    #[test]
    fn resolve_requires_token() {
        let err = PublishConfig::resolve(raw("acme/site"), None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn env_token_wins_over_file_token() {
        let mut r = raw("acme/site");
        r.token = Some("file-token".into());
        let config = PublishConfig::resolve(r.clone(), Some("env-token".into())).unwrap();
        assert_eq!(config.token, "env-token");

        let config = PublishConfig::resolve(r, None).unwrap();
        assert_eq!(config.token, "file-token");
    }

    #[test]
    fn empty_env_token_falls_back_to_file() {
        let mut r = raw("acme/site");
        r.token = Some("file-token".into());
        let config = PublishConfig::resolve(r, Some(String::new())).unwrap();
        assert_eq!(config.token, "file-token");
    }

    #[test]
    fn rejects_slashed_prefix_edges() {
        let mut r = raw("acme/site");
        r.path_prefix = Some("/reports".into());
        assert!(PublishConfig::resolve(r, Some("tok".into())).is_err());

        let mut r = raw("acme/site");
        r.path_prefix = Some("reports/".into());
        assert!(PublishConfig::resolve(r, Some("tok".into())).is_err());
    }

    #[test]
    fn empty_prefix_is_dropped() {
        let mut r = raw("acme/site");
        r.path_prefix = Some(String::new());
        let config = PublishConfig::resolve(r, Some("tok".into())).unwrap();
        assert!(config.path_prefix.is_none());
    }

    #[test]
    fn from_file_parses_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
repository = "acme/site"
branch = "pages"
pattern = "**/*.png"
custom_domain = "regs.example.com"
path_prefix = "reports"
"#
        )
        .unwrap();

        let raw = RawConfig::from_file(file.path()).unwrap();
        let config = PublishConfig::resolve(raw, Some("tok".into())).unwrap();
        assert_eq!(config.branch, "pages");
        assert_eq!(config.pattern.as_deref(), Some("**/*.png"));
        assert_eq!(config.custom_domain.as_deref(), Some("regs.example.com"));
        assert_eq!(config.path_prefix.as_deref(), Some("reports"));
    }

    #[test]
    fn from_file_rejects_unknown_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "repo = \"typo/field\"").unwrap();

        let err = RawConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let err = RawConfig::from_file(Path::new("/nonexistent/regpages.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
