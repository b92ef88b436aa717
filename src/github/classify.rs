// Response classification for the GitHub REST API.
// Turns a raw status, headers, and body into a typed outcome.

use reqwest::header::HeaderMap;

use crate::error::Error;

use super::types::RateLimit;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Maximum number of body bytes kept in an API error excerpt.
pub const EXCERPT_LIMIT: usize = 200;

const NO_DETAILS: &str = "No error details";

/// Interpreted result of a single HTTP exchange.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success { headers: HeaderMap, body: String },
    AuthFailure { status: u16 },
    /// `reset_epoch` is `None` when the upstream did not send a usable reset header.
    RateLimited { reset_epoch: Option<u64> },
    NotFound,
    ApiError { status: u16, excerpt: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Convert into the success payload, mapping failures to errors.
    /// `url` is only used to label `NotFound`.
    pub fn into_success(self, url: &str) -> Result<(HeaderMap, String), Error> {
        match self {
            Outcome::Success { headers, body } => Ok((headers, body)),
            Outcome::AuthFailure { status } => Err(Error::Unauthorized { status }),
            Outcome::RateLimited { reset_epoch } => Err(Error::RateLimited { reset_epoch }),
            Outcome::NotFound => Err(Error::NotFound(url.to_string())),
            Outcome::ApiError { status, excerpt } => Err(Error::Api { status, excerpt }),
        }
    }
}

/// Classify a response. Never fails; malformed headers degrade to "unknown".
pub fn classify(status: u16, headers: &HeaderMap, body: &str) -> Outcome {
    if status < 400 {
        return Outcome::Success {
            headers: headers.clone(),
            body: body.to_string(),
        };
    }

    match status {
        401 => Outcome::AuthFailure { status },
        403 if header_str(headers, RATE_LIMIT_REMAINING) == Some("0") => Outcome::RateLimited {
            reset_epoch: header_str(headers, RATE_LIMIT_RESET).and_then(parse_epoch),
        },
        403 => Outcome::AuthFailure { status },
        404 => Outcome::NotFound,
        _ => Outcome::ApiError {
            status,
            excerpt: excerpt(body),
        },
    }
}

/// Trimmed header value as a string, if present and visible ASCII.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}

/// Parse an unsigned decimal epoch. Signs, blanks, and overflow are rejected.
fn parse_epoch(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// First `EXCERPT_LIMIT` bytes of the body, cut on a char boundary.
fn excerpt(body: &str) -> String {
    if body.is_empty() {
        return NO_DETAILS.to_string();
    }
    let mut end = body.len().min(EXCERPT_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

impl RateLimit {
    /// Snapshot rate limit headers. Missing or garbled values are `None`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let number = |name| header_str(headers, name).and_then(parse_epoch);
        Self {
            limit: number(RATE_LIMIT_LIMIT),
            remaining: number(RATE_LIMIT_REMAINING),
            reset: number(RATE_LIMIT_RESET),
        }
    }
}

/// Format a reset epoch as wall-clock time, or "unknown time".
pub fn format_reset_time(reset_epoch: Option<u64>) -> String {
    reset_epoch
        .and_then(|epoch| i64::try_from(epoch).ok())
        .and_then(|epoch| chrono::DateTime::from_timestamp(epoch, 0))
        .map(|dt| dt.format("%H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown time".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_success_below_400() {
        for status in [200, 201, 204, 301, 304, 399] {
            let outcome = classify(status, &HeaderMap::new(), "[]");
            assert!(outcome.is_success(), "status {status}");
        }
    }

    #[test]
    fn test_success_keeps_body_and_headers() {
        let map = headers(&[("link", "<https://x>; rel=\"next\"")]);
        match classify(200, &map, "[1,2]") {
            Outcome::Success { headers, body } => {
                assert_eq!(body, "[1,2]");
                assert!(headers.contains_key("link"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_401_is_auth_failure() {
        assert!(matches!(
            classify(401, &HeaderMap::new(), "Bad credentials"),
            Outcome::AuthFailure { status: 401 }
        ));
    }

    #[test]
    fn test_403_rate_limited_with_reset() {
        let map = headers(&[
            ("X-RateLimit-Remaining", "0"),
            ("X-RateLimit-Reset", "1700000000"),
        ]);
        assert!(matches!(
            classify(403, &map, ""),
            Outcome::RateLimited {
                reset_epoch: Some(1_700_000_000)
            }
        ));
    }

    #[test]
    fn test_403_rate_limited_with_invalid_reset() {
        for reset in ["soon", "-5", "+5", "", "12.5", "99999999999999999999999"] {
            let map = headers(&[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", reset)]);
            assert!(
                matches!(
                    classify(403, &map, ""),
                    Outcome::RateLimited { reset_epoch: None }
                ),
                "reset {reset:?}"
            );
        }

        let missing = headers(&[("X-RateLimit-Remaining", "0")]);
        assert!(matches!(
            classify(403, &missing, ""),
            Outcome::RateLimited { reset_epoch: None }
        ));
    }

    #[test]
    fn test_403_without_exhausted_limit_is_auth_failure() {
        let remaining = headers(&[("X-RateLimit-Remaining", "42")]);
        assert!(matches!(
            classify(403, &remaining, "Forbidden"),
            Outcome::AuthFailure { status: 403 }
        ));
        assert!(matches!(
            classify(403, &HeaderMap::new(), "Forbidden"),
            Outcome::AuthFailure { status: 403 }
        ));
    }

    #[test]
    fn test_404_is_not_found() {
        assert!(matches!(
            classify(404, &HeaderMap::new(), "Not Found"),
            Outcome::NotFound
        ));
    }

    #[test]
    fn test_other_errors_carry_truncated_excerpt() {
        let body = "x".repeat(1000);
        match classify(500, &HeaderMap::new(), &body) {
            Outcome::ApiError { status, excerpt } => {
                assert_eq!(status, 500);
                assert_eq!(excerpt.len(), EXCERPT_LIMIT);
            }
            other => panic!("unexpected {other:?}"),
        }

        match classify(422, &HeaderMap::new(), "") {
            Outcome::ApiError { excerpt, .. } => assert_eq!(excerpt, "No error details"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        // 'é' is two bytes, so byte 200 falls mid-character.
        let body = format!("a{}", "é".repeat(150));
        let cut = excerpt(&body);
        assert!(cut.len() <= EXCERPT_LIMIT);
        assert_eq!(cut.len(), 199);
    }

    #[test]
    fn test_into_success_maps_errors() {
        let err = Outcome::NotFound.into_success("/repos/a/b").unwrap_err();
        assert!(matches!(err, Error::NotFound(url) if url == "/repos/a/b"));

        let err = Outcome::RateLimited { reset_epoch: Some(9) }
            .into_success("/x")
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited { reset_epoch: Some(9) }));
    }

    #[test]
    fn test_rate_limit_snapshot() {
        let map = headers(&[
            ("X-RateLimit-Limit", "5000"),
            ("X-RateLimit-Remaining", "4999"),
            ("X-RateLimit-Reset", "bogus"),
        ]);
        let limit = RateLimit::from_headers(&map);
        assert_eq!(limit.limit, Some(5000));
        assert_eq!(limit.remaining, Some(4999));
        assert_eq!(limit.reset, None);
    }

    #[test]
    fn test_format_reset_time() {
        assert_eq!(format_reset_time(None), "unknown time");
        assert_eq!(format_reset_time(Some(0)), "00:00:00 UTC");
        assert_eq!(format_reset_time(Some(3661)), "01:01:01 UTC");
        assert_eq!(format_reset_time(Some(u64::MAX)), "unknown time");
    }
}
