// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Owner type discriminator (user or organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OwnerType {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Unknown,
}

/// GitHub user or organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: u64,
    pub login: String,
    #[serde(rename = "type", default)]
    pub owner_type: OwnerType,
    pub avatar_url: Option<String>,
}

/// GitHub repository, trimmed to what the dashboard summarizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub private: bool,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub disabled: bool,
    pub default_branch: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Author or committer signature inside a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitSignature {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Git-level commit data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: Option<GitSignature>,
    pub committer: Option<GitSignature>,
}

/// Commit as returned by the repository commits listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
    pub html_url: String,
    /// GitHub account linked to the author, if any.
    pub author: Option<Owner>,
}

impl Commit {
    /// Author date, falling back to committer date.
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        let author = self.commit.author.as_ref().and_then(|s| s.date);
        author.or_else(|| self.commit.committer.as_ref().and_then(|s| s.date))
    }
}

/// Pull request summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
    pub user: Option<Owner>,
    #[serde(default)]
    pub requested_reviewers: Vec<Owner>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PullRequest {
    /// Whether `login` is a requested reviewer (case-insensitive).
    pub fn requests_review_from(&self, login: &str) -> bool {
        self.requested_reviewers
            .iter()
            .any(|r| r.login.eq_ignore_ascii_case(login))
    }
}

/// Repository reference inside an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRepo {
    pub id: u64,
    pub name: String,
}

/// Public activity event for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: EventRepo,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// File metadata and base64 content from the contents API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl FileContent {
    /// Decode the content as UTF-8 text. GitHub wraps base64 at 60 columns.
    ///
    /// Returns `None` when the response carries no inline content, which GitHub
    /// does for files over 1 MB (`"encoding": "none"`).
    pub fn decoded_text(&self) -> Result<Option<String>> {
        if self.content.trim().is_empty() {
            return Ok(None);
        }
        match self.encoding.as_deref() {
            Some("none") => Ok(None),
            Some("base64") | None => {
                let compact: String = self
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let bytes = STANDARD
                    .decode(compact)
                    .map_err(|e| Error::Decode(e.to_string()))?;
                String::from_utf8(bytes)
                    .map(Some)
                    .map_err(|e| Error::Decode(e.to_string()))
            }
            Some(other) => Err(Error::Decode(format!("unsupported encoding: {}", other))),
        }
    }
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}
