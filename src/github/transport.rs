// HTTP transport for the GitHub REST API.
// Sends requests, retries transient network faults, and classifies responses.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::{debug, warn};

use crate::config::{ApiSettings, Credential};
use crate::error::{Error, Result};

use super::classify::{Outcome, classify};

const GITHUB_API_VERSION: &str = "2022-11-28";

/// A single GET request against the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Request for the page behind a `next` link. The link already carries the query.
    pub fn follow(&self, next_url: &str) -> Self {
        Self::get(next_url)
    }
}

/// Unclassified response as read off the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Kind of network-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Could not establish a connection.
    Connect,
    /// The request or body read timed out.
    Timeout,
    /// The request could not be built or sent for another reason.
    Request,
    /// The response body could not be read.
    Body,
}

/// Network-level failure, distinct from any classified API outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFault {
    pub kind: FaultKind,
    pub message: String,
}

impl TransportFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Connection and timeout faults are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, FaultKind::Connect | FaultKind::Timeout)
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FaultKind::Connect => "connection failed",
            FaultKind::Timeout => "timed out",
            FaultKind::Request => "request failed",
            FaultKind::Body => "could not read response",
        };
        write!(f, "{}: {}", kind, self.message)
    }
}

impl std::error::Error for TransportFault {}

impl From<reqwest::Error> for TransportFault {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FaultKind::Timeout
        } else if err.is_connect() {
            FaultKind::Connect
        } else if err.is_body() || err.is_decode() {
            FaultKind::Body
        } else {
            FaultKind::Request
        };
        // Strip the URL so query strings never end up in logs.
        Self::new(kind, err.without_url().to_string())
    }
}

/// Something that can perform a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportFault>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client that sends the bearer token and GitHub headers on every request.
    pub fn new(credential: &Credential, settings: &ApiSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.token()))
            .map_err(|e| Error::Config(format!("invalid token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("repopulse"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportFault> {
        let response = self
            .client
            .get(&request.url)
            .query(&request.query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Retry bounds for transient faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(500),
        }
    }
}

/// Wraps a transport with bounded retries and response classification.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Send a request and classify the response.
    ///
    /// Only connection and timeout faults are retried. Classified outcomes,
    /// including API errors, are returned on the first response.
    pub async fn execute(&self, request: &ApiRequest) -> std::result::Result<Outcome, TransportFault> {
        let mut attempt = 0;
        loop {
            debug!(url = %request.url, attempt, "GET");
            match self.inner.send(request).await {
                Ok(raw) => return Ok(classify(raw.status, &raw.headers, &raw.body)),
                Err(fault) if fault.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(
                        url = %request.url,
                        attempt,
                        max_retries = self.policy.max_retries,
                        "transient fault, retrying: {}",
                        fault
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(fault) => return Err(fault),
            }
        }
    }
}
