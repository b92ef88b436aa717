// Process configuration for repopulse.
// Loads the credential from the environment and tuning knobs from an optional TOML file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::github::transport::RetryPolicy;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Static bearer token plus the login it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    token: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// HTTP and retry settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub per_page: u32,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            per_page: 100,
            timeout: Duration::from_secs(10),
            max_retries: retry.max_retries,
            retry_delay: retry.delay,
        }
    }
}

impl ApiSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: self.retry_delay,
        }
    }
}

/// Per-operation TTLs and pagination bounds for the cached service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// TTL for volatile listings (repos, commits, pull requests, events).
    pub list_ttl: Duration,
    /// TTL for slower-changing documents (file contents).
    pub document_ttl: Duration,
    pub languages_ttl: Duration,
    pub commit_max_pages: usize,
    pub event_max_pages: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            list_ttl: Duration::from_secs(5 * 60),
            document_ttl: Duration::from_secs(15 * 60),
            languages_ttl: Duration::from_secs(60 * 60),
            commit_max_pages: 3,
            event_max_pages: 3,
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credential: Credential,
    pub api: ApiSettings,
    pub cache: CacheSettings,
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api: ApiSection,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub per_page: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub list_ttl_secs: Option<u64>,
    pub document_ttl_secs: Option<u64>,
    pub languages_ttl_secs: Option<u64>,
    pub commit_max_pages: Option<usize>,
    pub event_max_pages: Option<usize>,
}

impl FileConfig {
    /// Parse a TOML config file.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Default config file location (~/.config/repopulse/config.toml on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "repopulse").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Settings {
    /// Load settings from the process environment and a config file.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => FileConfig::read(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => FileConfig::read(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::from_sources(|key| std::env::var(key).ok(), file)
    }

    /// Resolve settings with environment values taking precedence over the file.
    pub fn from_sources(env: impl Fn(&str) -> Option<String>, file: FileConfig) -> Result<Self> {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let token = non_empty("GITHUB_TOKEN").ok_or(Error::MissingToken)?;
        let username = non_empty("GITHUB_USERNAME").ok_or(Error::MissingUsername)?;

        let defaults = ApiSettings::default();
        let api = ApiSettings {
            base_url: non_empty("REPOPULSE_API_BASE")
                .or(file.api.base_url)
                .unwrap_or(defaults.base_url),
            per_page: file.api.per_page.unwrap_or(defaults.per_page),
            timeout: file
                .api
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_retries: file.api.max_retries.unwrap_or(defaults.max_retries),
            retry_delay: file
                .api
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        };
        if !(1..=100).contains(&api.per_page) {
            return Err(Error::Config(format!(
                "per_page must be between 1 and 100, got {}",
                api.per_page
            )));
        }

        let defaults = CacheSettings::default();
        let secs = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_secs).unwrap_or(fallback)
        };
        let cache = CacheSettings {
            list_ttl: secs(file.cache.list_ttl_secs, defaults.list_ttl),
            document_ttl: secs(file.cache.document_ttl_secs, defaults.document_ttl),
            languages_ttl: secs(file.cache.languages_ttl_secs, defaults.languages_ttl),
            commit_max_pages: file
                .cache
                .commit_max_pages
                .unwrap_or(defaults.commit_max_pages),
            event_max_pages: file
                .cache
                .event_max_pages
                .unwrap_or(defaults.event_max_pages),
        };

        Ok(Self {
            credential: Credential::new(username.trim(), token.trim()),
            api,
            cache,
        })
    }
}
