// repopulse library.
// Cached, rate-limit aware access to the GitHub REST API for a personal repository dashboard.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod service;

pub use cache::{CacheMetrics, CacheStats, CacheStore, CachedOperation};
pub use config::{Credential, Settings};
pub use error::{Error, Result};
pub use github::GitHubClient;
pub use service::CachedGitHub;
