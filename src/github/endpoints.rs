// GitHub API endpoint functions.
// Provides typed methods for the listings and documents the dashboard reads.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::classify::Outcome;
use super::client::GitHubClient;
use super::transport::{ApiRequest, Transport};
use super::types::{Commit, Event, FileContent, PullRequest, Repository};

/// Half-open time window for commit listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since, until }
    }

    /// Window ending now and covering the last `days` days, truncated to seconds.
    ///
    /// Negative counts give an empty window; spans past chrono's range start at
    /// the earliest representable time.
    pub fn last_days(days: i64) -> Self {
        let until = Utc::now();
        let until = DateTime::from_timestamp(until.timestamp(), 0).unwrap_or(until);
        Self::ending_at(until, days)
    }

    fn ending_at(until: DateTime<Utc>, days: i64) -> Self {
        let since = TimeDelta::try_days(days.max(0))
            .and_then(|span| until.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { since, until }
    }
}

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl<T: Transport> GitHubClient<T> {
    /// Get repositories owned by the authenticated user, most recently pushed first.
    pub async fn list_user_repos(&self) -> Result<Vec<Repository>> {
        let request = ApiRequest::get(self.url("/user/repos"))
            .param("per_page", self.page_size())
            .param("affiliation", "owner")
            .param("sort", "pushed");
        self.fetch_all(request).await
    }

    /// Get commits for a repository inside a time window, reading at most `max_pages` pages.
    pub async fn list_repo_commits(
        &self,
        owner: &str,
        repo: &str,
        window: &TimeWindow,
        max_pages: usize,
    ) -> Result<Vec<Commit>> {
        let request = ApiRequest::get(self.url(&format!("/repos/{}/{}/commits", owner, repo)))
            .param("since", iso(&window.since))
            .param("until", iso(&window.until))
            .param("per_page", self.page_size());
        self.fetch_bounded(request, max_pages).await
    }

    /// Get a file from a repository. Returns `None` if the file does not exist.
    pub async fn get_file_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<FileContent>> {
        let path = path.trim_start_matches('/');
        let request =
            ApiRequest::get(self.url(&format!("/repos/{}/{}/contents/{}", owner, repo, path)));
        let (_, body) = match self.execute(&request).await? {
            Outcome::NotFound => return Ok(None),
            outcome => outcome.into_success(&request.url)?,
        };
        match serde_json::from_str::<ContentsBody>(&body)? {
            ContentsBody::File(file) => Ok(Some(file)),
            ContentsBody::Listing(_) => Err(Error::Decode(format!("{} is a directory", path))),
        }
    }

    /// Get open pull requests for a repository.
    pub async fn list_repo_pull_requests(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<PullRequest>> {
        let request = ApiRequest::get(self.url(&format!("/repos/{}/{}/pulls", owner, repo)))
            .param("state", "open")
            .param("per_page", self.page_size());
        self.fetch_all(request).await
    }

    /// Get recent events performed by a user, reading at most `max_pages` pages.
    pub async fn list_user_events(&self, username: &str, max_pages: usize) -> Result<Vec<Event>> {
        let request = ApiRequest::get(self.url(&format!("/users/{}/events", username)))
            .param("per_page", self.page_size());
        self.fetch_bounded(request, max_pages).await
    }

    /// Get language byte counts for a repository. Missing repositories report no languages.
    pub async fn get_repo_languages(&self, owner: &str, repo: &str) -> Result<BTreeMap<String, u64>> {
        let request = ApiRequest::get(self.url(&format!("/repos/{}/{}/languages", owner, repo)));
        let (_, body) = match self.execute(&request).await? {
            Outcome::NotFound => return Ok(BTreeMap::new()),
            outcome => outcome.into_success(&request.url)?,
        };
        Ok(serde_json::from_str(&body)?)
    }
}

/// Raw wrapper used when GitHub reports a directory instead of a file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsBody {
    File(FileContent),
    Listing(Vec<IgnoredAny>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::transport::RetryPolicy;
    use crate::github::transport::testing::*;

    #[test]
    fn test_time_window_spans_requested_days() {
        let until = DateTime::from_timestamp(1_760_097_600, 0).unwrap();

        let window = TimeWindow::ending_at(until, 7);
        assert_eq!(window.until - window.since, TimeDelta::days(7));

        let window = TimeWindow::ending_at(until, -3);
        assert_eq!(window.since, window.until);

        let window = TimeWindow::ending_at(until, i64::MAX);
        assert_eq!(window.since, DateTime::<Utc>::MIN_UTC);
        assert_eq!(window.until, until);
    }

    fn client(transport: ScriptedTransport) -> GitHubClient<ScriptedTransport> {
        GitHubClient::with_transport(transport, "https://api.github.com", RetryPolicy::default())
    }

    const REPO: &str = r#"{
        "id": 1, "name": "alpha", "full_name": "octocat/alpha",
        "owner": {"id": 2, "login": "octocat", "avatar_url": null},
        "private": true, "description": null, "html_url": "https://github.com/octocat/alpha",
        "language": "Rust", "default_branch": "main",
        "pushed_at": "2025-10-10T00:00:00Z", "updated_at": "2025-10-10T00:00:00Z"
    }"#;

    #[tokio::test]
    async fn test_list_user_repos_sends_listing_params() {
        let client = client(ScriptedTransport::new().reply(response(200, &format!("[{}]", REPO))));

        let repos = client.list_user_repos().await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "alpha");

        let request = &client.transport().inner().requests()[0];
        assert_eq!(request.url, "https://api.github.com/user/repos");
        assert!(request.query.contains(&("sort".to_string(), "pushed".to_string())));
        assert!(request.query.contains(&("per_page".to_string(), "100".to_string())));
    }

    #[tokio::test]
    async fn test_list_repo_commits_formats_window() {
        let client = client(ScriptedTransport::new().reply(response(200, "[]")));
        let window = TimeWindow::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            DateTime::from_timestamp(1_700_086_400, 0).unwrap(),
        );

        let commits = client
            .list_repo_commits("octocat", "alpha", &window, 3)
            .await
            .unwrap();
        assert!(commits.is_empty());

        let request = &client.transport().inner().requests()[0];
        assert_eq!(request.url, "https://api.github.com/repos/octocat/alpha/commits");
        assert!(request.query.contains(&("since".to_string(), "2023-11-14T22:13:20Z".to_string())));
        assert!(request.query.contains(&("until".to_string(), "2023-11-15T22:13:20Z".to_string())));
    }

    #[tokio::test]
    async fn test_get_file_contents_absent_is_none() {
        let client = client(ScriptedTransport::new().reply(response(404, "Not Found")));

        let file = client
            .get_file_contents("octocat", "alpha", "/comms/FEATURES.md")
            .await
            .unwrap();
        assert!(file.is_none());
        assert_eq!(
            client.transport().inner().requests()[0].url,
            "https://api.github.com/repos/octocat/alpha/contents/comms/FEATURES.md"
        );
    }

    #[tokio::test]
    async fn test_get_file_contents_decodes() {
        let body = r#"{"name": "README.md", "path": "README.md", "sha": "abc",
            "size": 5, "encoding": "base64", "content": "aGVsbG8=\n"}"#;
        let client = client(ScriptedTransport::new().reply(response(200, body)));

        let file = client
            .get_file_contents("octocat", "alpha", "README.md")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.decoded_text().unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_get_file_contents_rejects_directory() {
        let client = client(ScriptedTransport::new().reply(response(200, "[]")));

        let err = client
            .get_file_contents("octocat", "alpha", "comms")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(msg) if msg.contains("directory")));
    }

    #[tokio::test]
    async fn test_get_file_contents_surfaces_auth_failure() {
        let client = client(ScriptedTransport::new().reply(response(401, "Bad credentials")));

        let err = client
            .get_file_contents("octocat", "alpha", "README.md")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized { status: 401 }));
    }

    #[tokio::test]
    async fn test_list_user_events_is_bounded() {
        let client = client(
            ScriptedTransport::new().always(with_next(response(200, "[]"), "https://api/next")),
        );

        let events = client.list_user_events("octocat", 3).await.unwrap();
        assert!(events.is_empty());
        assert_eq!(client.transport().inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_repo_languages_missing_repo_is_empty() {
        let client = client(
            ScriptedTransport::new()
                .reply(response(404, ""))
                .reply(response(200, r#"{"Rust": 1200, "Shell": 30}"#)),
        );

        assert!(client.get_repo_languages("o", "gone").await.unwrap().is_empty());
        let languages = client.get_repo_languages("o", "r").await.unwrap();
        assert_eq!(languages.get("Rust"), Some(&1200));
    }

    #[test]
    fn test_last_days_window() {
        let window = TimeWindow::last_days(30);
        assert_eq!(window.until - window.since, chrono::Duration::days(30));
        assert_eq!(window.until.timestamp_subsec_nanos(), 0);
    }
}
