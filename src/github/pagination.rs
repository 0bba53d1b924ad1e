//! Response header helpers for the paginated events endpoint.
//!
//! GitHub paginates with an RFC 8288 `Link` header and reports quota usage
//! through the `x-ratelimit-*` headers.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::HeaderMap;

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<(?P<url>.+?)>; rel="(?P<rel>.+?)""#).unwrap());

/// Page URLs advertised by a `Link` header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLinks {
    pub next: Option<String>,
    pub last: Option<String>,
    pub prev: Option<String>,
    pub first: Option<String>,
}

impl PageLinks {
    pub fn parse(header: &str) -> Self {
        let mut links = PageLinks::default();
        for caps in LINK_PATTERN.captures_iter(header) {
            let url = caps["url"].to_string();
            match &caps["rel"] {
                "next" => links.next = Some(url),
                "last" => links.last = Some(url),
                "prev" => links.prev = Some(url),
                "first" => links.first = Some(url),
                _ => {}
            }
        }
        links
    }

    /// URL of the page to request after `current`, or `None` once `current`
    /// is the last page.
    pub fn follow(&self, current: &str) -> Option<&str> {
        match (&self.next, &self.last) {
            (Some(next), Some(last)) if last != current => Some(next.as_str()),
            _ => None,
        }
    }
}

/// Quota figures reported with every API response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub used: Option<u64>,
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            limit: header_number(headers, "x-ratelimit-limit"),
            remaining: header_number(headers, "x-ratelimit-remaining"),
            used: header_number(headers, "x-ratelimit-used"),
            reset: header_number(headers, "x-ratelimit-reset")
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// Metadata worth logging for each fetched page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub etag: Option<String>,
    /// Seconds GitHub asks clients to wait between polls
    pub poll_interval: Option<u64>,
    pub links: PageLinks,
    pub rate_limit: RateLimit,
}

impl PageMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            etag: header_str(headers, "etag").map(str::to_string),
            poll_interval: header_number(headers, "x-poll-interval"),
            links: header_str(headers, "link")
                .map(PageLinks::parse)
                .unwrap_or_default(),
            rate_limit: RateLimit::from_headers(headers),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn header_number(headers: &HeaderMap, name: &str) -> Option<u64> {
    header_str(headers, name).and_then(|value| value.trim().parse().ok())
}
