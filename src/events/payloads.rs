//! Payload records carried by each event kind, plus the GitHub objects they
//! embed (users, issues, pull requests, repositories...).
//!
//! Every record ignores fields it does not name, so new upstream fields never
//! break decoding. Fields typed `Option<_>` may be absent or `null`; every
//! other field is required. Shapes that have not been observed in real
//! payloads are kept as raw JSON (`serde_json::Value`) instead of guessed.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// A GitHub account as embedded in issues, pull requests, releases...
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub login: String,
    pub id: u64,
    pub node_id: String,
    pub avatar_url: String,
    pub gravatar_id: Option<String>,
    pub url: String,
    pub html_url: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub site_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Label {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub name: String,
    pub color: String,
    pub default: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Reactions {
    pub url: String,
    pub total_count: u64,
    #[serde(rename = "+1")]
    pub plus_one: u64,
    #[serde(rename = "-1")]
    pub minus_one: u64,
    pub laugh: u64,
    pub hooray: u64,
    pub confused: u64,
    pub heart: u64,
    pub rocket: u64,
    pub eyes: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub node_id: String,
    pub number: u64,
    pub url: String,
    pub html_url: String,
    pub title: String,
    pub description: Option<String>,
    pub creator: Option<User>,
    pub open_issues: u64,
    pub closed_issues: u64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_on: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Sub-link present on an issue when that issue is actually a pull request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssuePullRequest {
    pub url: String,
    pub html_url: String,
    pub diff_url: String,
    pub patch_url: String,
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub node_id: String,
    pub number: u64,
    pub url: String,
    pub repository_url: String,
    pub html_url: String,
    pub title: String,
    pub user: User,
    pub labels: Vec<Label>,
    pub state: String,
    pub state_reason: Option<String>,
    pub locked: bool,
    pub active_lock_reason: Option<String>,
    pub assignee: Option<User>,
    pub assignees: Vec<User>,
    pub milestone: Option<Milestone>,
    pub comments: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub author_association: String,
    pub body: Option<String>,
    pub reactions: Reactions,
    pub performed_via_github_app: Option<Value>,
    pub pull_request: Option<IssuePullRequest>,
}

impl Issue {
    /// GitHub reports pull requests through the issues API too; they are the
    /// ones carrying a `pull_request` sub-link.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// A comment on an issue or pull request conversation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub html_url: String,
    pub issue_url: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_association: String,
    pub body: String,
    pub reactions: Reactions,
    pub performed_via_github_app: Option<Value>,
}

/// A comment left on a diff line during review.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewComment {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub html_url: String,
    pub pull_request_url: String,
    pub pull_request_review_id: Option<u64>,
    pub in_reply_to_id: Option<u64>,
    pub diff_hunk: String,
    pub path: String,
    pub commit_id: String,
    pub original_commit_id: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_association: String,
    pub body: String,
    pub reactions: Reactions,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct License {
    pub key: String,
    pub name: String,
    pub spdx_id: Option<String>,
    pub url: Option<String>,
    pub node_id: String,
}

/// Full repository object, as found in fork payloads and branch refs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Repo {
    pub id: u64,
    pub node_id: String,
    pub name: String,
    pub full_name: String,
    pub owner: User,
    pub private: bool,
    pub html_url: String,
    pub url: String,
    pub description: Option<String>,
    pub fork: bool,
    pub homepage: Option<String>,
    pub language: Option<String>,
    pub default_branch: String,
    pub visibility: Option<String>,
    pub archived: bool,
    pub disabled: bool,
    pub stargazers_count: u64,
    pub watchers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub license: Option<License>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Head or base side of a pull request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BranchRef {
    pub label: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    pub user: User,
    /// `None` once the source repository of a pull request has been deleted.
    pub repo: Option<Repo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
    pub html: Link,
    pub issue: Link,
    pub comments: Link,
    pub review_comments: Link,
    pub review_comment: Link,
    pub commits: Link,
    pub statuses: Link,
}

/// Full pull-request snapshot sent with `PullRequestEvent`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub node_id: String,
    pub number: u64,
    pub url: String,
    pub html_url: String,
    pub diff_url: String,
    pub patch_url: String,
    pub issue_url: String,
    pub state: String,
    pub locked: bool,
    pub active_lock_reason: Option<String>,
    pub title: String,
    pub user: User,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
    pub assignee: Option<User>,
    pub assignees: Vec<User>,
    pub requested_reviewers: Vec<User>,
    pub requested_teams: Vec<Value>,
    pub labels: Vec<Label>,
    pub milestone: Option<Milestone>,
    pub draft: bool,
    pub head: BranchRef,
    pub base: BranchRef,
    #[serde(rename = "_links")]
    pub links: PullRequestLinks,
    pub author_association: String,
    pub auto_merge: Option<Value>,
    pub merged: bool,
    pub mergeable: Option<bool>,
    pub rebaseable: Option<bool>,
    pub mergeable_state: String,
    pub merged_by: Option<User>,
    pub comments: u64,
    pub review_comments: u64,
    pub maintainer_can_modify: bool,
    pub commits: u64,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

/// Reduced pull-request snapshot sent with review events: no merge status
/// and no diff statistics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestSummary {
    pub id: u64,
    pub node_id: String,
    pub number: u64,
    pub url: String,
    pub html_url: String,
    pub diff_url: String,
    pub patch_url: String,
    pub issue_url: String,
    pub state: String,
    pub locked: bool,
    pub active_lock_reason: Option<String>,
    pub title: String,
    pub user: User,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
    pub assignee: Option<User>,
    pub assignees: Vec<User>,
    pub requested_reviewers: Vec<User>,
    pub requested_teams: Vec<Value>,
    pub labels: Vec<Label>,
    pub milestone: Option<Milestone>,
    pub draft: bool,
    pub head: BranchRef,
    pub base: BranchRef,
    #[serde(rename = "_links")]
    pub links: PullRequestLinks,
    pub author_association: String,
    pub auto_merge: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReviewLinks {
    pub html: Link,
    pub pull_request: Link,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Review {
    pub id: u64,
    pub node_id: String,
    pub user: User,
    pub body: Option<String>,
    pub commit_id: String,
    pub submitted_at: DateTime<Utc>,
    pub state: String,
    pub html_url: String,
    pub pull_request_url: String,
    pub author_association: String,
    #[serde(rename = "_links")]
    pub links: ReviewLinks,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitAuthor {
    pub email: String,
    pub name: String,
}

/// Commit listed in a push payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushCommit {
    pub sha: String,
    pub author: CommitAuthor,
    pub message: String,
    pub distinct: bool,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Release {
    pub id: u64,
    pub node_id: String,
    pub url: String,
    pub html_url: String,
    pub assets_url: String,
    pub upload_url: String,
    pub tarball_url: Option<String>,
    pub zipball_url: Option<String>,
    pub author: User,
    pub tag_name: String,
    pub target_commitish: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub assets: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GollumPage {
    pub page_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub action: String,
    pub sha: String,
    pub html_url: String,
}

/// Payload whose shape has never been observed; kept verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct OpaquePayload(pub Value);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatePayload {
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
    pub ref_type: String,
    pub master_branch: String,
    pub description: Option<String>,
    pub pusher_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeletePayload {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub ref_type: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForkPayload {
    pub forkee: Repo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GollumPayload {
    pub pages: Vec<GollumPage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssueCommentPayload {
    pub action: String,
    pub issue: Issue,
    pub comment: Comment,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssuesPayload {
    pub action: String,
    pub issue: Issue,
    pub assignee: Option<User>,
    pub label: Option<Label>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemberPayload {
    pub action: String,
    pub member: User,
}

/// `PublicEvent` carries an empty object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicPayload {}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequest,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestReviewPayload {
    pub action: String,
    pub pull_request: PullRequestSummary,
    pub review: Review,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestReviewCommentPayload {
    pub action: String,
    pub pull_request: PullRequestSummary,
    pub comment: ReviewComment,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequestReviewThreadPayload {
    pub action: String,
    pub pull_request: PullRequestSummary,
    pub thread: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushPayload {
    pub repository_id: u64,
    pub push_id: u64,
    pub size: u64,
    pub distinct_size: u64,
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub head: String,
    pub before: String,
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReleasePayload {
    pub action: String,
    pub release: Release,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SponsorshipPayload {
    pub action: String,
    pub effective_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchPayload {
    pub action: String,
}
