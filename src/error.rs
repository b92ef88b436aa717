// Error types for repopulse.
// Maps classified GitHub API failures, transport faults, and configuration problems.

use thiserror::Error;

use crate::github::classify::format_reset_time;
use crate::github::transport::TransportFault;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed (HTTP {status}): check token scope and permissions")]
    Unauthorized { status: u16 },

    #[error("Rate limit exceeded, resets at {}", format_reset_time(.reset_epoch.as_ref().copied()))]
    RateLimited { reset_epoch: Option<u64> },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("GitHub API error {status}: {excerpt}")]
    Api { status: u16, excerpt: String },

    #[error("Network error: {0}")]
    Transport(#[from] TransportFault),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Content decoding error: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing GITHUB_TOKEN environment variable")]
    MissingToken,

    #[error("Missing GITHUB_USERNAME environment variable")]
    MissingUsername,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is an upstream rate limit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Whether this error is an authentication or permission failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthorized { .. } | Error::MissingToken)
    }

    /// Short, actionable guidance for display next to the error.
    pub fn user_hint(&self) -> String {
        match self {
            Error::RateLimited { reset_epoch } => format!(
                "GitHub rate limit reached. Try again after {}.",
                format_reset_time(*reset_epoch)
            ),
            Error::Unauthorized { .. } | Error::MissingToken => {
                "Check that GITHUB_TOKEN is valid and has the repo scope.".to_string()
            }
            Error::MissingUsername => "Set GITHUB_USERNAME to your GitHub login.".to_string(),
            Error::Config(_) => "Fix the configuration file and restart.".to_string(),
            _ => "Something went wrong talking to GitHub. Please retry in a moment.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::transport::FaultKind;

    #[test]
    fn test_rate_limited_hint_mentions_unknown_reset() {
        let err = Error::RateLimited { reset_epoch: None };
        assert!(err.is_rate_limited());
        assert!(!err.is_auth());
        assert!(err.user_hint().contains("unknown time"));
        assert!(err.to_string().contains("unknown time"));
    }

    #[test]
    fn test_auth_and_generic_hints_differ() {
        let auth = Error::Unauthorized { status: 403 };
        let fault = Error::from(TransportFault::new(FaultKind::Timeout, "timed out"));

        assert!(auth.is_auth());
        assert!(auth.user_hint().contains("GITHUB_TOKEN"));
        assert!(fault.user_hint().contains("retry"));
        assert_eq!(auth.to_string(), "Authentication failed (HTTP 403): check token scope and permissions");
    }
}
