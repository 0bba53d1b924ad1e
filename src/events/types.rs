use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::payloads::*;

/// The account that triggered an event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Actor {
    pub id: u64,
    pub login: String,
    pub display_login: Option<String>,
    pub gravatar_id: Option<String>,
    pub url: String,
    pub avatar_url: String,
}

/// Repository reference carried by every event (`owner/name` in `name`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepoRef {
    pub id: u64,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Org {
    pub id: u64,
    pub login: String,
    pub gravatar_id: Option<String>,
    pub url: String,
    pub avatar_url: String,
}

/// Every event kind the registry knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CommitComment,
    Create,
    Delete,
    Fork,
    Gollum,
    IssueComment,
    Issues,
    Member,
    Public,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    PullRequestReviewThread,
    Push,
    Release,
    Sponsorship,
    Watch,
}

impl EventKind {
    pub const ALL: [EventKind; 17] = [
        EventKind::CommitComment,
        EventKind::Create,
        EventKind::Delete,
        EventKind::Fork,
        EventKind::Gollum,
        EventKind::IssueComment,
        EventKind::Issues,
        EventKind::Member,
        EventKind::Public,
        EventKind::PullRequest,
        EventKind::PullRequestReview,
        EventKind::PullRequestReviewComment,
        EventKind::PullRequestReviewThread,
        EventKind::Push,
        EventKind::Release,
        EventKind::Sponsorship,
        EventKind::Watch,
    ];

    /// The value of the `type` field for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::CommitComment => "CommitCommentEvent",
            EventKind::Create => "CreateEvent",
            EventKind::Delete => "DeleteEvent",
            EventKind::Fork => "ForkEvent",
            EventKind::Gollum => "GollumEvent",
            EventKind::IssueComment => "IssueCommentEvent",
            EventKind::Issues => "IssuesEvent",
            EventKind::Member => "MemberEvent",
            EventKind::Public => "PublicEvent",
            EventKind::PullRequest => "PullRequestEvent",
            EventKind::PullRequestReview => "PullRequestReviewEvent",
            EventKind::PullRequestReviewComment => "PullRequestReviewCommentEvent",
            EventKind::PullRequestReviewThread => "PullRequestReviewThreadEvent",
            EventKind::Push => "PushEvent",
            EventKind::Release => "ReleaseEvent",
            EventKind::Sponsorship => "SponsorshipEvent",
            EventKind::Watch => "WatchEvent",
        }
    }

    /// Resolve a `type` field value. Matching is exact: anything not listed
    /// in [`EventKind::ALL`] is unknown.
    pub fn from_discriminator(value: &str) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific data, selected by the `type` field of the event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum EventPayload {
    #[serde(rename = "CommitCommentEvent")]
    CommitComment(OpaquePayload),
    #[serde(rename = "CreateEvent")]
    Create(CreatePayload),
    #[serde(rename = "DeleteEvent")]
    Delete(DeletePayload),
    #[serde(rename = "ForkEvent")]
    Fork(ForkPayload),
    #[serde(rename = "GollumEvent")]
    Gollum(GollumPayload),
    #[serde(rename = "IssueCommentEvent")]
    IssueComment(IssueCommentPayload),
    #[serde(rename = "IssuesEvent")]
    Issues(IssuesPayload),
    #[serde(rename = "MemberEvent")]
    Member(MemberPayload),
    #[serde(rename = "PublicEvent")]
    Public(PublicPayload),
    #[serde(rename = "PullRequestEvent")]
    PullRequest(PullRequestPayload),
    #[serde(rename = "PullRequestReviewEvent")]
    PullRequestReview(PullRequestReviewPayload),
    #[serde(rename = "PullRequestReviewCommentEvent")]
    PullRequestReviewComment(PullRequestReviewCommentPayload),
    #[serde(rename = "PullRequestReviewThreadEvent")]
    PullRequestReviewThread(PullRequestReviewThreadPayload),
    #[serde(rename = "PushEvent")]
    Push(PushPayload),
    #[serde(rename = "ReleaseEvent")]
    Release(ReleasePayload),
    #[serde(rename = "SponsorshipEvent")]
    Sponsorship(SponsorshipPayload),
    #[serde(rename = "WatchEvent")]
    Watch(WatchPayload),
}

impl EventPayload {
    /// Validate `payload` against the schema registered for `kind`.
    pub fn decode(kind: EventKind, payload: &Value) -> Result<EventPayload, serde_json::Error> {
        Ok(match kind {
            EventKind::CommitComment => {
                EventPayload::CommitComment(OpaquePayload::deserialize(payload)?)
            }
            EventKind::Create => EventPayload::Create(CreatePayload::deserialize(payload)?),
            EventKind::Delete => EventPayload::Delete(DeletePayload::deserialize(payload)?),
            EventKind::Fork => EventPayload::Fork(ForkPayload::deserialize(payload)?),
            EventKind::Gollum => EventPayload::Gollum(GollumPayload::deserialize(payload)?),
            EventKind::IssueComment => {
                EventPayload::IssueComment(IssueCommentPayload::deserialize(payload)?)
            }
            EventKind::Issues => EventPayload::Issues(IssuesPayload::deserialize(payload)?),
            EventKind::Member => EventPayload::Member(MemberPayload::deserialize(payload)?),
            EventKind::Public => EventPayload::Public(PublicPayload::deserialize(payload)?),
            EventKind::PullRequest => {
                EventPayload::PullRequest(PullRequestPayload::deserialize(payload)?)
            }
            EventKind::PullRequestReview => {
                EventPayload::PullRequestReview(PullRequestReviewPayload::deserialize(payload)?)
            }
            EventKind::PullRequestReviewComment => EventPayload::PullRequestReviewComment(
                PullRequestReviewCommentPayload::deserialize(payload)?,
            ),
            EventKind::PullRequestReviewThread => EventPayload::PullRequestReviewThread(
                PullRequestReviewThreadPayload::deserialize(payload)?,
            ),
            EventKind::Push => EventPayload::Push(PushPayload::deserialize(payload)?),
            EventKind::Release => EventPayload::Release(ReleasePayload::deserialize(payload)?),
            EventKind::Sponsorship => {
                EventPayload::Sponsorship(SponsorshipPayload::deserialize(payload)?)
            }
            EventKind::Watch => EventPayload::Watch(WatchPayload::deserialize(payload)?),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::CommitComment(_) => EventKind::CommitComment,
            EventPayload::Create(_) => EventKind::Create,
            EventPayload::Delete(_) => EventKind::Delete,
            EventPayload::Fork(_) => EventKind::Fork,
            EventPayload::Gollum(_) => EventKind::Gollum,
            EventPayload::IssueComment(_) => EventKind::IssueComment,
            EventPayload::Issues(_) => EventKind::Issues,
            EventPayload::Member(_) => EventKind::Member,
            EventPayload::Public(_) => EventKind::Public,
            EventPayload::PullRequest(_) => EventKind::PullRequest,
            EventPayload::PullRequestReview(_) => EventKind::PullRequestReview,
            EventPayload::PullRequestReviewComment(_) => EventKind::PullRequestReviewComment,
            EventPayload::PullRequestReviewThread(_) => EventKind::PullRequestReviewThread,
            EventPayload::Push(_) => EventKind::Push,
            EventPayload::Release(_) => EventKind::Release,
            EventPayload::Sponsorship(_) => EventKind::Sponsorship,
            EventPayload::Watch(_) => EventKind::Watch,
        }
    }
}

/// One decoded activity event: the common envelope plus its typed payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub id: String,
    pub actor: Actor,
    pub repo: RepoRef,
    pub org: Option<Org>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// Minimal view of an event: the common fields and the raw `type` value,
/// without looking at the payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub actor: Actor,
    pub repo: RepoRef,
    pub org: Option<Org>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl EventEnvelope {
    /// Attach an already validated payload to this envelope.
    pub fn into_event(self, payload: EventPayload) -> Event {
        Event {
            id: self.id,
            actor: self.actor,
            repo: self.repo,
            org: self.org,
            created_at: self.created_at,
            payload,
        }
    }
}
