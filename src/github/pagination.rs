// Link-header pagination for GitHub list endpoints.
// Follows rel="next" links to collect full or page-bounded listings.

use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

use super::classify::Outcome;
use super::client::GitHubClient;
use super::transport::{ApiRequest, Transport};

/// How many pages a listing may fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    Unbounded,
    /// Stop after this many requests even if more pages exist.
    Bounded(usize),
}

impl PageLimit {
    fn allows(&self, fetched: usize) -> bool {
        match self {
            PageLimit::Unbounded => true,
            PageLimit::Bounded(max) => fetched < *max,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Extract the URL of the `next` relation from a Link header value.
pub fn parse_next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let url = parts.next()?.trim();
        let url = url.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        is_next.then(|| url.to_string())
    })
}

fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_next_link)
}

impl<T: Transport> GitHubClient<T> {
    /// Fetch a single page of a JSON array listing. `None` means the listing was not found.
    pub async fn fetch_page<I: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<Option<Page<I>>> {
        let (headers, body) = match self.execute(request).await? {
            Outcome::NotFound => return Ok(None),
            outcome => outcome.into_success(&request.url)?,
        };
        let items: Vec<I> = serde_json::from_str(&body).map_err(Error::Json)?;
        Ok(Some(Page {
            items,
            next: next_link(&headers),
        }))
    }

    /// Fetch every page of a listing.
    pub async fn fetch_all<I: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<I>> {
        self.fetch_pages(request, PageLimit::Unbounded).await
    }

    /// Fetch at most `max_pages` pages of a listing.
    pub async fn fetch_bounded<I: DeserializeOwned>(
        &self,
        request: ApiRequest,
        max_pages: usize,
    ) -> Result<Vec<I>> {
        self.fetch_pages(request, PageLimit::Bounded(max_pages)).await
    }

    /// Collect pages in order until there is no `next` link or the limit is hit.
    ///
    /// A `NotFound` on any page ends the listing with what has been collected
    /// so far (an empty repository has no commit history). Every other failure
    /// is returned without partial results.
    pub async fn fetch_pages<I: DeserializeOwned>(
        &self,
        request: ApiRequest,
        limit: PageLimit,
    ) -> Result<Vec<I>> {
        let mut items = Vec::new();
        let mut fetched = 0;
        let mut current = Some(request);

        while let Some(request) = current.take() {
            if !limit.allows(fetched) {
                debug!(url = %request.url, pages = fetched, "page limit reached");
                break;
            }

            let Some(page) = self.fetch_page::<I>(&request).await? else {
                debug!(url = %request.url, pages = fetched, "listing not found, ending");
                break;
            };
            fetched += 1;

            items.extend(page.items);
            current = page.next.map(|next| request.follow(&next));
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::transport::testing::*;
    use crate::github::transport::{FaultKind, RetryPolicy};

    const BASE: &str = "https://api.github.com/repos/o/r/commits";

    fn client(transport: ScriptedTransport) -> GitHubClient<ScriptedTransport> {
        GitHubClient::with_transport(transport, "https://api.github.com", RetryPolicy::default())
    }

    #[test]
    fn test_parse_next_link_example() {
        let header = r#"<https://api/x?page=2>; rel="next", <https://api/x?page=5>; rel="last""#;
        assert_eq!(parse_next_link(header), Some("https://api/x?page=2".to_string()));
    }

    #[test]
    fn test_parse_next_link_absent() {
        let header = r#"<https://api/x?page=1>; rel="prev", <https://api/x?page=5>; rel="last""#;
        assert_eq!(parse_next_link(header), None);
        assert_eq!(parse_next_link(""), None);
        assert_eq!(parse_next_link("garbage"), None);
    }

    #[test]
    fn test_parse_next_link_in_any_position() {
        let header = r#"<https://api/x?page=1>; rel="first", <https://api/x?page=3>; rel="next""#;
        assert_eq!(parse_next_link(header), Some("https://api/x?page=3".to_string()));

        let unquoted = "<https://api/x?page=4>; rel=next";
        assert_eq!(parse_next_link(unquoted), Some("https://api/x?page=4".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_all_follows_links_in_order() {
        let client = client(
            ScriptedTransport::new()
                .reply(with_next(response(200, "[1,2]"), "https://api/p2"))
                .reply(with_next(response(200, "[3]"), "https://api/p3"))
                .reply(response(200, "[4,5]")),
        );

        let items: Vec<u32> = client.fetch_all(ApiRequest::get(BASE)).await.unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);

        let urls: Vec<String> = client.transport().inner().requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec![BASE, "https://api/p2", "https://api/p3"]);
    }

    #[tokio::test]
    async fn test_fetch_bounded_stops_at_max_pages() {
        let client = client(
            ScriptedTransport::new().always(with_next(response(200, "[1]"), "https://api/more")),
        );

        let items: Vec<u32> = client.fetch_bounded(ApiRequest::get(BASE), 2).await.unwrap();
        assert_eq!(items, vec![1, 1]);
        assert_eq!(client.transport().inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_bounded_zero_pages_issues_no_requests() {
        let client = client(ScriptedTransport::new().always(response(200, "[1]")));

        let items: Vec<u32> = client.fetch_bounded(ApiRequest::get(BASE), 0).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(client.transport().inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_not_found_first_page_is_empty() {
        let client = client(ScriptedTransport::new().reply(response(404, "Not Found")));

        let items: Vec<u32> = client.fetch_all(ApiRequest::get(BASE)).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_mid_listing_keeps_earlier_pages() {
        let client = client(
            ScriptedTransport::new()
                .reply(with_next(response(200, "[1,2]"), "https://api/p2"))
                .reply(response(404, "")),
        );

        let items: Vec<u32> = client.fetch_all(ApiRequest::get(BASE)).await.unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_other_failures_escalate_without_partial_results() {
        let client = client(
            ScriptedTransport::new()
                .reply(with_next(response(200, "[1,2]"), "https://api/p2"))
                .reply(with_header(
                    with_header(response(403, ""), "x-ratelimit-remaining", "0"),
                    "x-ratelimit-reset",
                    "1700000000",
                )),
        );

        let err = client
            .fetch_all::<u32>(ApiRequest::get(BASE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RateLimited {
                reset_epoch: Some(1_700_000_000)
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_mid_listing_escalates() {
        let client = client(
            ScriptedTransport::new()
                .reply(with_next(response(200, "[1]"), "https://api/p2"))
                .fault(FaultKind::Connect)
                .fault(FaultKind::Connect)
                .fault(FaultKind::Connect),
        );

        let err = client.fetch_all::<u32>(ApiRequest::get(BASE)).await.unwrap_err();
        assert!(matches!(err, Error::Transport(fault) if fault.kind == FaultKind::Connect));
        assert_eq!(client.transport().inner().calls(), 4);
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let client = client(ScriptedTransport::new().reply(response(200, "{not json")));

        let err = client.fetch_all::<u32>(ApiRequest::get(BASE)).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
