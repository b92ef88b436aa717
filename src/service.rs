// Cached read operations consumed by the dashboard.
// Wraps each GitHub endpoint in the shared memoization cache with its own TTL.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cache::{CacheMetrics, CacheStats, CacheStore, CachedOperation};
use crate::config::{CacheSettings, Settings};
use crate::error::Result;
use crate::github::{
    Commit, Event, GitHubClient, PullRequest, RateLimit, ReqwestTransport, Repository, TimeWindow,
    Transport,
};

pub const LIST_USER_REPOS: &str = "list_user_repos";
pub const LIST_REPO_COMMITS: &str = "list_repo_commits";
pub const GET_FILE_TEXT: &str = "get_file_text";
pub const LIST_REPO_PULL_REQUESTS: &str = "list_repo_pull_requests";
pub const LIST_USER_EVENTS: &str = "list_user_events";
pub const GET_REPO_LANGUAGES: &str = "get_repo_languages";

/// Registered operations with their TTLs.
#[derive(Debug, Clone, Copy)]
struct Operations {
    repos: CachedOperation,
    commits: CachedOperation,
    file: CachedOperation,
    pulls: CachedOperation,
    events: CachedOperation,
    languages: CachedOperation,
}

impl Operations {
    fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            repos: CachedOperation::new(LIST_USER_REPOS, settings.list_ttl),
            commits: CachedOperation::new(LIST_REPO_COMMITS, settings.list_ttl),
            file: CachedOperation::new(GET_FILE_TEXT, settings.document_ttl),
            pulls: CachedOperation::new(LIST_REPO_PULL_REQUESTS, settings.list_ttl),
            events: CachedOperation::new(LIST_USER_EVENTS, settings.list_ttl),
            languages: CachedOperation::new(GET_REPO_LANGUAGES, settings.languages_ttl),
        }
    }
}

/// GitHub reads for one user, memoized in a shared cache.
///
/// Every read takes an optional cache-bust token as its last argument. A
/// token forces a fresh fetch once; repeating the same token hits again.
pub struct CachedGitHub<T = ReqwestTransport> {
    client: GitHubClient<T>,
    cache: Arc<CacheStore>,
    username: String,
    settings: CacheSettings,
    ops: Operations,
}

impl CachedGitHub<ReqwestTransport> {
    /// Build the production service from resolved settings.
    pub fn from_settings(settings: &Settings, cache: Arc<CacheStore>) -> Result<Self> {
        let client = GitHubClient::new(&settings.credential, &settings.api)?;
        Ok(Self::new(
            client,
            cache,
            settings.credential.username(),
            settings.cache,
        ))
    }
}

impl<T: Transport> CachedGitHub<T> {
    pub fn new(
        client: GitHubClient<T>,
        cache: Arc<CacheStore>,
        username: &str,
        settings: CacheSettings,
    ) -> Self {
        Self {
            client,
            cache,
            username: username.to_string(),
            settings,
            ops: Operations::from_settings(&settings),
        }
    }

    pub fn client(&self) -> &GitHubClient<T> {
        &self.client
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Repositories owned by the configured user.
    pub async fn list_user_repos(&self, cache_bust: Option<&str>) -> Result<Vec<Repository>> {
        self.cache
            .memoize(&self.ops.repos, &(self.username.as_str(),), cache_bust, || {
                self.client.list_user_repos()
            })
            .await
    }

    /// Commits in `window`, limited to the configured number of pages.
    pub async fn list_repo_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &TimeWindow,
        cache_bust: Option<&str>,
    ) -> Result<Vec<Commit>> {
        let max_pages = self.settings.commit_max_pages;
        self.cache
            .memoize(
                &self.ops.commits,
                &(owner, repo, window, max_pages),
                cache_bust,
                || self.client.list_repo_commits(owner, repo, window, max_pages),
            )
            .await
    }

    /// Text of a file, or `None` if it does not exist or has no inline content.
    /// Absence is cached too.
    pub async fn get_file_text(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        cache_bust: Option<&str>,
    ) -> Result<Option<String>> {
        self.cache
            .memoize(&self.ops.file, &(owner, repo, path), cache_bust, || async {
                self.client
                    .get_file_contents(owner, repo, path)
                    .await
                    .and_then(|file| file.map_or(Ok(None), |f| f.decoded_text()))
            })
            .await
    }

    /// Open pull requests for a repository.
    pub async fn list_repo_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        cache_bust: Option<&str>,
    ) -> Result<Vec<PullRequest>> {
        self.cache
            .memoize(&self.ops.pulls, &(owner, repo), cache_bust, || {
                self.client.list_repo_pull_requests(owner, repo)
            })
            .await
    }

    /// Recent public activity for the configured user.
    pub async fn list_user_events(&self, cache_bust: Option<&str>) -> Result<Vec<Event>> {
        let max_pages = self.settings.event_max_pages;
        self.cache
            .memoize(
                &self.ops.events,
                &(self.username.as_str(), max_pages),
                cache_bust,
                || self.client.list_user_events(&self.username, max_pages),
            )
            .await
    }

    /// Language byte counts for a repository.
    pub async fn get_repo_languages(
        &self,
        owner: &str,
        repo: &str,
        cache_bust: Option<&str>,
    ) -> Result<BTreeMap<String, u64>> {
        self.cache
            .memoize(&self.ops.languages, &(owner, repo), cache_bust, || {
                self.client.get_repo_languages(owner, repo)
            })
            .await
    }

    /// Rate limit headers from the last upstream response.
    pub fn rate_limit(&self) -> RateLimit {
        self.client.rate_limit()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    /// Invalidate every cached read.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Zero the hit/miss counters without touching cached values.
    pub fn reset_cache_metrics(&self) {
        self.cache.reset_telemetry();
    }
}
