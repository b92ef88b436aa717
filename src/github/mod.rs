// GitHub API module.
// Provides the client, transport, pagination, and types for the GitHub REST API.

pub mod classify;
pub mod client;
pub mod endpoints;
pub mod pagination;
pub mod transport;
pub mod types;

pub use classify::{Outcome, classify, format_reset_time};
pub use client::GitHubClient;
pub use endpoints::TimeWindow;
pub use pagination::{Page, PageLimit, parse_next_link};
pub use transport::{
    ApiRequest, FaultKind, RawResponse, ReqwestTransport, RetryPolicy, RetryingTransport,
    Transport, TransportFault,
};
pub use types::*;
