pub mod pagination;

pub use pagination::{PageLinks, PageMeta, RateLimit};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const API_VERSION: &str = "2022-11-28";
const CLIENT_NAME: &str = "gh-activity-report";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Failed to access event snapshot {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON array of events from {0}")]
    NotAnArray(String),
}

/// Anything able to produce a user's raw activity events, oldest page last,
/// in the order GitHub lists them.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Human-readable description of where events come from
    fn name(&self) -> String;

    async fn raw_events(&self) -> Result<Vec<Value>, SourceError>;
}

/// The `GET /users/{username}/events` REST endpoint, followed page by page.
pub struct GitHubApi {
    client: reqwest::Client,
    base_url: String,
    username: String,
    token: String,
    per_page: u32,
}

impl GitHubApi {
    pub fn new(base_url: &str, username: &str, token: &str, per_page: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            token: token.to_string(),
            per_page,
        }
    }

    fn first_page_url(&self) -> String {
        format!(
            "{}/users/{}/events?per_page={}",
            self.base_url, self.username, self.per_page
        )
    }
}

#[async_trait]
impl EventSource for GitHubApi {
    fn name(&self) -> String {
        format!("GitHub events of {}", self.username)
    }

    /// Pages are requested one at a time so the rate limit is respected.
    #[instrument(skip(self), fields(username = %self.username))]
    async fn raw_events(&self) -> Result<Vec<Value>, SourceError> {
        let mut all_events = Vec::new();
        let mut url = self.first_page_url();

        loop {
            debug!(url = %url, "fetching events page");
            let response = self
                .client
                .get(&url)
                .header(ACCEPT, "application/vnd.github+json")
                .header("X-GitHub-Api-Version", API_VERSION)
                .header(USER_AGENT, CLIENT_NAME)
                .bearer_auth(&self.token)
                .send()
                .await?
                .error_for_status()?;

            let meta = PageMeta::from_headers(response.headers());
            let page = response.json::<Value>().await?;
            let Value::Array(events) = page else {
                return Err(SourceError::NotAnArray(url));
            };

            info!(
                events = events.len(),
                etag = ?meta.etag,
                poll_interval = ?meta.poll_interval,
                next = ?meta.links.next,
                last = ?meta.links.last,
                prev = ?meta.links.prev,
                first = ?meta.links.first,
                "events page fetched"
            );
            let rate = &meta.rate_limit;
            match rate.remaining {
                Some(0) => warn!(reset = ?rate.reset, "rate limit exhausted"),
                _ => debug!(
                    used = ?rate.used,
                    limit = ?rate.limit,
                    remaining = ?rate.remaining,
                    reset = ?rate.reset,
                    "rate limit status"
                ),
            }

            all_events.extend(events);

            match meta.links.follow(&url) {
                Some(next) => url = next.to_string(),
                None => break,
            }
        }

        info!(total = all_events.len(), "all events fetched");
        Ok(all_events)
    }
}

/// A JSON array of raw events stored on disk.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the snapshot with `events`, creating parent directories.
    #[instrument(skip(self, events), fields(path = %self.path.display(), events = events.len()))]
    pub async fn write(&self, events: &[Value]) -> Result<(), SourceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        let json = serde_json::to_string(events)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.io_error(source))?;
        debug!("snapshot written");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Snapshot {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl EventSource for SnapshotFile {
    fn name(&self) -> String {
        format!("snapshot {}", self.path.display())
    }

    async fn raw_events(&self) -> Result<Vec<Value>, SourceError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        parse_event_array(&contents, &self.name())
    }
}

/// Events embedded in the binary, used by the demo mode.
pub struct InlineSnapshot {
    label: &'static str,
    json: &'static str,
}

impl InlineSnapshot {
    pub fn new(label: &'static str, json: &'static str) -> Self {
        Self { label, json }
    }
}

#[async_trait]
impl EventSource for InlineSnapshot {
    fn name(&self) -> String {
        self.label.to_string()
    }

    async fn raw_events(&self) -> Result<Vec<Value>, SourceError> {
        parse_event_array(self.json, self.label)
    }
}

/// Reads the snapshot when there is one, otherwise asks `upstream` and saves
/// what it returns for the next run.
pub struct CachedSource<S> {
    snapshot: SnapshotFile,
    upstream: S,
    refresh: bool,
}

impl<S: EventSource> CachedSource<S> {
    /// With `refresh`, the snapshot is always rebuilt from `upstream`.
    pub fn new(snapshot: SnapshotFile, upstream: S, refresh: bool) -> Self {
        Self {
            snapshot,
            upstream,
            refresh,
        }
    }
}

#[async_trait]
impl<S: EventSource> EventSource for CachedSource<S> {
    fn name(&self) -> String {
        format!("{} cached in {}", self.upstream.name(), self.snapshot.path().display())
    }

    async fn raw_events(&self) -> Result<Vec<Value>, SourceError> {
        if self.snapshot.exists() && !self.refresh {
            info!(path = %self.snapshot.path().display(), "loading events from snapshot");
            return self.snapshot.raw_events().await;
        }

        info!(source = %self.upstream.name(), "snapshot missing or refresh requested, fetching events");
        let events = self.upstream.raw_events().await?;
        self.snapshot.write(&events).await?;
        Ok(events)
    }
}

fn parse_event_array(contents: &str, origin: &str) -> Result<Vec<Value>, SourceError> {
    match serde_json::from_str::<Value>(contents)? {
        Value::Array(events) => Ok(events),
        _ => Err(SourceError::NotAnArray(origin.to_string())),
    }
}
