use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::events::payloads::BranchRef;
use crate::events::Event;

/// How the reducer orders events before folding them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassOrdering {
    /// Pull-request events first, then issue comments; each pass sorted by
    /// time on its own.
    #[default]
    PerKind,
    /// Both kinds merged into a single time-ordered pass.
    Chronological,
}

/// One timestamped entry in a pull request's or issue's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub description: String,
    pub at: DateTime<Utc>,
    /// Login of the acting user
    pub by: String,
}

impl Action {
    pub fn from_event(description: String, event: &Event) -> Self {
        Self {
            description,
            at: event.created_at,
            by: event.actor.login.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Commit {
    pub creator: String,
    pub sha: String,
}

/// Source branch of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub ref_name: String,
    /// Full name of the repository the branch lives in; unknown once that
    /// repository has been deleted.
    pub repo: Option<String>,
    pub commits: BTreeSet<Commit>,
}

impl Branch {
    pub fn from_head(head: &BranchRef) -> Self {
        Self {
            ref_name: head.ref_name.clone(),
            repo: head.repo.as_ref().map(|repo| repo.full_name.clone()),
            commits: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    /// Login of the pull request author
    pub creator: String,
    /// Issues the description says this pull request closes
    pub linked_issues: BTreeSet<u64>,
    /// Only known once a pull-request event (not just a comment) was seen.
    pub branch: Option<Branch>,
    pub actions: Vec<Action>,
}

impl PullRequest {
    pub fn new(number: u64, title: &str, creator: &str) -> Self {
        Self {
            number,
            title: title.to_string(),
            creator: creator.to_string(),
            linked_issues: BTreeSet::new(),
            branch: None,
            actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub creator: String,
    pub actions: Vec<Action>,
}

impl Issue {
    pub fn new(number: u64, title: &str, creator: &str) -> Self {
        Self {
            number,
            title: title.to_string(),
            creator: creator.to_string(),
            actions: Vec::new(),
        }
    }
}

/// Everything the report knows about one repository, keyed by number and
/// kept in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub name: String,
    pub pull_requests: IndexMap<u64, PullRequest>,
    pub issues: IndexMap<u64, Issue>,
    pub branches: IndexMap<String, Branch>,
}

impl Repository {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pull_requests: IndexMap::new(),
            issues: IndexMap::new(),
            branches: IndexMap::new(),
        }
    }
}

/// Result of one aggregation run, keyed by repository name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityReport {
    pub repositories: IndexMap<String, Repository>,
}
