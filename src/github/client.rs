// GitHub API HTTP client.
// Owns the retrying transport, builds endpoint URLs, and tracks rate limit state.

use std::sync::Mutex;

use tracing::warn;

use crate::config::{ApiSettings, Credential};
use crate::error::Result;

use super::classify::Outcome;
use super::transport::{ApiRequest, ReqwestTransport, RetryPolicy, RetryingTransport, Transport};
use super::types::RateLimit;

/// GitHub API client with retries and rate limit tracking.
#[derive(Debug)]
pub struct GitHubClient<T = ReqwestTransport> {
    transport: RetryingTransport<T>,
    base_url: String,
    per_page: u32,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubClient<ReqwestTransport> {
    /// Create a client that authenticates with the given credential.
    pub fn new(credential: &Credential, settings: &ApiSettings) -> Result<Self> {
        let transport = ReqwestTransport::new(credential, settings)?;
        Ok(Self::with_transport(transport, &settings.base_url, settings.retry_policy())
            .per_page(settings.per_page))
    }
}

impl<T: Transport> GitHubClient<T> {
    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: T, base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            transport: RetryingTransport::new(transport, policy),
            base_url: base_url.trim_end_matches('/').to_string(),
            per_page: 100,
            rate_limit: Mutex::new(RateLimit::default()),
        }
    }

    /// Set the page size requested from list endpoints.
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(1, 100);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.per_page
    }

    pub fn transport(&self) -> &RetryingTransport<T> {
        &self.transport
    }

    /// Absolute URL for an API path such as `/user/repos`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Rate limit headers from the most recent response.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
            .lock()
            .map(|limit| *limit)
            .unwrap_or_default()
    }

    /// Execute a request and classify the response.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Outcome> {
        let outcome = self.transport.execute(request).await?;
        self.update_rate_limit(&outcome);
        Ok(outcome)
    }

    /// Update rate limit from a classified response.
    fn update_rate_limit(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Success { headers, .. } => {
                if let Ok(mut limit) = self.rate_limit.lock() {
                    *limit = RateLimit::from_headers(headers);
                }
            }
            Outcome::RateLimited { reset_epoch } => {
                warn!(reset_epoch = ?reset_epoch, "GitHub rate limit exhausted");
                if let Ok(mut limit) = self.rate_limit.lock() {
                    limit.remaining = Some(0);
                    limit.reset = *reset_epoch;
                }
            }
            _ => {}
        }
    }
}
