pub mod types;

pub use types::{Action, ActivityReport, Branch, Issue, PassOrdering, PullRequest, Repository};

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, trace};

use crate::events::payloads::{IssueCommentPayload, PullRequestPayload};
use crate::events::{Event, EventKind, EventPayload};

static LINKED_ISSUE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:close(?:s|d)?|fix(?:es|ed)?|resolve(?:s|d)?)\s+#(\d+)").unwrap()
});

/// Collect the issue numbers a pull request description closes
/// (`Fixes #12`, `closes #3`, `Resolved #7`...).
pub fn extract_linked_issues(body: &str) -> BTreeSet<u64> {
    LINKED_ISSUE_PATTERN
        .captures_iter(body)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Fold decoded events into per-repository pull requests and issues.
///
/// Only pull-request and issue-comment events contribute; everything else
/// is ignored. The input order only matters to break timestamp ties.
#[instrument(skip(events), fields(events = events.len()))]
pub fn aggregate(events: &[Event], ordering: PassOrdering) -> ActivityReport {
    let mut report = ActivityReport::default();

    match ordering {
        PassOrdering::PerKind => {
            for event in sorted_by_time(events, &[EventKind::PullRequest]) {
                report.apply(event);
            }
            for event in sorted_by_time(events, &[EventKind::IssueComment]) {
                report.apply(event);
            }
        }
        PassOrdering::Chronological => {
            let kinds = [EventKind::PullRequest, EventKind::IssueComment];
            for event in sorted_by_time(events, &kinds) {
                report.apply(event);
            }
        }
    }

    debug!(repositories = report.repositories.len(), "aggregation complete");
    report
}

fn sorted_by_time<'a>(events: &'a [Event], kinds: &[EventKind]) -> Vec<&'a Event> {
    let mut selected: Vec<&Event> = events
        .iter()
        .filter(|event| kinds.contains(&event.kind()))
        .collect();
    // stable: equal timestamps keep their input order
    selected.sort_by_key(|event| event.created_at);
    selected
}

impl ActivityReport {
    /// Apply a single event; kinds other than pull-request and issue-comment
    /// events are ignored.
    pub fn apply(&mut self, event: &Event) {
        match &event.payload {
            EventPayload::PullRequest(payload) => self.apply_pull_request(event, payload),
            EventPayload::IssueComment(payload) => self.apply_issue_comment(event, payload),
            _ => trace!(kind = %event.kind(), id = %event.id, "event not aggregated"),
        }
    }

    fn repository_mut(&mut self, name: &str) -> &mut Repository {
        self.repositories
            .entry(name.to_string())
            .or_insert_with(|| Repository::new(name))
    }

    fn apply_pull_request(&mut self, event: &Event, payload: &PullRequestPayload) {
        let snapshot = &payload.pull_request;
        let repo = self.repository_mut(&event.repo.name);
        let pr = repo
            .pull_requests
            .entry(snapshot.number)
            .or_insert_with(|| {
                PullRequest::new(snapshot.number, &snapshot.title, &snapshot.user.login)
            });

        pr.title.clone_from(&snapshot.title);
        pr.creator.clone_from(&snapshot.user.login);
        if pr.branch.is_none() {
            pr.branch = Some(Branch::from_head(&snapshot.head));
        }
        pr.actions
            .push(Action::from_event(format!("PR {}", payload.action), event));

        // an edited description replaces the previous references
        if let Some(body) = snapshot.body.as_deref().filter(|body| !body.is_empty()) {
            pr.linked_issues = extract_linked_issues(body);
        }
    }

    fn apply_issue_comment(&mut self, event: &Event, payload: &IssueCommentPayload) {
        let issue = &payload.issue;
        let repo = self.repository_mut(&event.repo.name);

        if issue.is_pull_request() {
            let pr = repo.pull_requests.entry(issue.number).or_insert_with(|| {
                PullRequest::new(issue.number, &issue.title, &issue.user.login)
            });
            pr.title.clone_from(&issue.title);
            pr.creator.clone_from(&issue.user.login);
            pr.actions.push(Action::from_event(
                format!("PR comment {}", payload.action),
                event,
            ));
        } else {
            let aggregate = repo
                .issues
                .entry(issue.number)
                .or_insert_with(|| Issue::new(issue.number, &issue.title, &issue.user.login));
            aggregate.title.clone_from(&issue.title);
            aggregate.creator.clone_from(&issue.user.login);
            aggregate.actions.push(Action::from_event(
                format!("Issue comment {}", payload.action),
                event,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::decode::decode_strict;
    use crate::events::decode::tests::sample_records;
    use serde_json::{json, Value};

    fn pr_event(repo: &str, number: u64, at: &str, action: &str, body: Option<&str>) -> Event {
        let mut raw: Value = sample_records()[3].clone();
        raw["repo"]["name"] = json!(repo);
        raw["created_at"] = json!(at);
        raw["payload"]["action"] = json!(action);
        raw["payload"]["number"] = json!(number);
        raw["payload"]["pull_request"]["number"] = json!(number);
        raw["payload"]["pull_request"]["body"] = json!(body);
        serde_json::from_value(raw).unwrap()
    }

    fn comment_event(repo: &str, number: u64, at: &str, on_pull_request: bool) -> Event {
        let mut raw: Value = sample_records()[4].clone();
        raw["repo"]["name"] = json!(repo);
        raw["created_at"] = json!(at);
        raw["payload"]["issue"]["number"] = json!(number);
        raw["payload"]["issue"]["title"] = json!(format!("Thread {number}"));
        if on_pull_request {
            raw["payload"]["issue"]["pull_request"] = json!({
                "url": "https://api.github.com/repos/o/r/pulls/1",
                "html_url": "https://github.com/o/r/pull/1",
                "diff_url": "https://github.com/o/r/pull/1.diff",
                "patch_url": "https://github.com/o/r/pull/1.patch",
                "merged_at": null
            });
        }
        serde_json::from_value(raw).unwrap()
    }

    fn descriptions(actions: &[Action]) -> Vec<&str> {
        actions.iter().map(|a| a.description.as_str()).collect()
    }

    #[test]
    fn test_extract_linked_issues_keywords() {
        let ids = extract_linked_issues("Fixes #42 and closes #7");
        assert_eq!(ids, BTreeSet::from([7, 42]));
    }

    #[test]
    fn test_extract_linked_issues_all_verb_forms() {
        let body = "close #1, closes #2, closed #3, fix #4, fixes #5, fixed #6, \
                    resolve #7, resolves #8, RESOLVED #9";
        assert_eq!(extract_linked_issues(body), (1..=9).collect::<BTreeSet<u64>>());
    }

    #[test]
    fn test_extract_linked_issues_ignores_plain_references() {
        assert!(extract_linked_issues("See #12, related to #13").is_empty());
        assert!(extract_linked_issues("fixes#12").is_empty());
        assert!(extract_linked_issues("").is_empty());
    }

    #[test]
    fn test_pull_request_actions_follow_timestamps_not_input_order() {
        let events = vec![
            pr_event("o/r", 1, "2024-02-02T00:00:00Z", "closed", None),
            pr_event("o/r", 1, "2024-02-01T00:00:00Z", "opened", None),
        ];
        let report = aggregate(&events, PassOrdering::PerKind);
        let pr = &report.repositories["o/r"].pull_requests[&1_u64];
        assert_eq!(descriptions(&pr.actions), ["PR opened", "PR closed"]);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let events = vec![
            pr_event("o/r", 1, "2024-02-01T00:00:00Z", "opened", None),
            pr_event("o/r", 1, "2024-02-01T00:00:00Z", "labeled", None),
        ];
        let report = aggregate(&events, PassOrdering::PerKind);
        let pr = &report.repositories["o/r"].pull_requests[&1_u64];
        assert_eq!(descriptions(&pr.actions), ["PR opened", "PR labeled"]);
    }

    #[test]
    fn test_linked_issues_replaced_only_by_non_empty_body() {
        let events = vec![
            pr_event("o/r", 1, "2024-02-01T00:00:00Z", "opened", Some("Fixes #42 and closes #7")),
            pr_event("o/r", 1, "2024-02-02T00:00:00Z", "edited", Some("")),
            pr_event("o/r", 1, "2024-02-03T00:00:00Z", "synchronize", None),
        ];
        let report = aggregate(&events, PassOrdering::PerKind);
        let pr = &report.repositories["o/r"].pull_requests[&1_u64];
        assert_eq!(pr.linked_issues, BTreeSet::from([7, 42]));

        let mut events = events;
        events.push(pr_event("o/r", 1, "2024-02-04T00:00:00Z", "edited", Some("resolves #9")));
        let report = aggregate(&events, PassOrdering::PerKind);
        let pr = &report.repositories["o/r"].pull_requests[&1_u64];
        assert_eq!(pr.linked_issues, BTreeSet::from([9]));
    }

    #[test]
    fn test_comment_on_pull_request_updates_pull_request() {
        let events = vec![comment_event("o/r", 5, "2024-02-01T00:00:00Z", true)];
        let report = aggregate(&events, PassOrdering::PerKind);
        let repo = &report.repositories["o/r"];
        assert!(repo.issues.is_empty());
        let pr = &repo.pull_requests[&5_u64];
        assert_eq!(pr.title, "Thread 5");
        assert!(pr.branch.is_none());
        assert_eq!(descriptions(&pr.actions), ["PR comment created"]);
    }

    #[test]
    fn test_comment_on_issue_updates_issue() {
        let events = vec![comment_event("o/r", 5, "2024-02-01T00:00:00Z", false)];
        let report = aggregate(&events, PassOrdering::PerKind);
        let repo = &report.repositories["o/r"];
        assert!(repo.pull_requests.is_empty());
        assert_eq!(descriptions(&repo.issues[&5_u64].actions), ["Issue comment created"]);
    }

    #[test]
    fn test_latest_issue_comment_refreshes_title_and_creator() {
        let first = comment_event("o/r", 5, "2024-02-01T00:00:00Z", false);
        let mut later = comment_event("o/r", 5, "2024-02-02T00:00:00Z", false);
        if let EventPayload::IssueComment(payload) = &mut later.payload {
            payload.issue.title = "Renamed thread".to_string();
            payload.issue.user.login = "hubot".to_string();
        }

        let report = aggregate(&[later, first], PassOrdering::PerKind);
        let issue = &report.repositories["o/r"].issues[&5_u64];
        assert_eq!(issue.title, "Renamed thread");
        assert_eq!(issue.creator, "hubot");
        assert_eq!(issue.actions.len(), 2);
    }

    #[test]
    fn test_comment_first_then_pull_request_event_share_aggregate() {
        let events = vec![
            comment_event("o/r", 1, "2024-02-01T00:00:00Z", true),
            pr_event("o/r", 1, "2024-02-02T00:00:00Z", "closed", Some("fixes #3")),
        ];
        let report = aggregate(&events, PassOrdering::Chronological);
        let repo = &report.repositories["o/r"];
        assert_eq!(repo.pull_requests.len(), 1);
        let pr = &repo.pull_requests[&1_u64];
        assert_eq!(descriptions(&pr.actions), ["PR comment created", "PR closed"]);
        assert_eq!(pr.branch.as_ref().map(|b| b.ref_name.as_str()), Some("fix-12"));
        assert_eq!(pr.linked_issues, BTreeSet::from([3]));
    }

    #[test]
    fn test_per_kind_passes_put_comments_after_pull_request_events() {
        let events = vec![
            pr_event("o/r", 1, "2024-02-03T00:00:00Z", "closed", None),
            comment_event("o/r", 1, "2024-02-02T00:00:00Z", true),
            pr_event("o/r", 1, "2024-02-01T00:00:00Z", "opened", None),
        ];

        let per_kind = aggregate(&events, PassOrdering::PerKind);
        assert_eq!(
            descriptions(&per_kind.repositories["o/r"].pull_requests[&1_u64].actions),
            ["PR opened", "PR closed", "PR comment created"]
        );

        let chronological = aggregate(&events, PassOrdering::Chronological);
        assert_eq!(
            descriptions(&chronological.repositories["o/r"].pull_requests[&1_u64].actions),
            ["PR opened", "PR comment created", "PR closed"]
        );
    }

    #[test]
    fn test_repositories_never_share_aggregates() {
        let events = vec![
            pr_event("a/one", 1, "2024-02-01T00:00:00Z", "opened", Some("fixes #2")),
            pr_event("b/two", 1, "2024-02-01T01:00:00Z", "opened", Some("fixes #3")),
            comment_event("b/two", 1, "2024-02-01T02:00:00Z", true),
        ];
        let report = aggregate(&events, PassOrdering::PerKind);
        let one = &report.repositories["a/one"].pull_requests[&1_u64];
        let two = &report.repositories["b/two"].pull_requests[&1_u64];
        assert_eq!(one.actions.len(), 1);
        assert_eq!(two.actions.len(), 2);
        assert_eq!(one.linked_issues, BTreeSet::from([2]));
        assert_eq!(two.linked_issues, BTreeSet::from([3]));
    }

    #[test]
    fn test_aggregate_is_repeatable() {
        let events = decode_strict(&sample_records()).unwrap();
        assert_eq!(
            aggregate(&events, PassOrdering::PerKind),
            aggregate(&events, PassOrdering::PerKind)
        );
    }

    #[test]
    fn test_sample_snapshot_report() {
        let events = decode_strict(&sample_records()).unwrap();
        let report = aggregate(&events, PassOrdering::PerKind);

        let names: Vec<&str> = report.repositories.keys().map(String::as_str).collect();
        assert_eq!(names, ["octo-org/spoon-knife", "octocat/hello-world"]);

        let spoon = &report.repositories["octo-org/spoon-knife"];
        let pr = &spoon.pull_requests[&12_u64];
        assert_eq!(pr.title, "Fix spoon bending under load");
        assert_eq!(pr.creator, "octocat");
        assert_eq!(pr.linked_issues, BTreeSet::from([3, 5]));
        assert_eq!(
            descriptions(&pr.actions),
            ["PR opened", "PR closed", "PR comment created"]
        );
        let branch = pr.branch.as_ref().unwrap();
        assert_eq!(branch.ref_name, "fix-12");
        assert_eq!(branch.repo.as_deref(), Some("octo-org/spoon-knife"));

        let issue = &spoon.issues[&5_u64];
        assert_eq!(issue.creator, "monalisa");
        assert_eq!(issue.actions[0].by, "octocat");

        let hello = &report.repositories["octocat/hello-world"];
        assert_eq!(hello.issues[&12_u64].title, "Greeting is not localized");
        let localize = &hello.pull_requests[&13_u64];
        assert_eq!(localize.creator, "monalisa");
        assert!(localize.linked_issues.is_empty());
        assert_eq!(
            localize.branch.as_ref().and_then(|b| b.repo.as_deref()),
            Some("monalisa/hello-world")
        );
        assert!(hello.branches.is_empty());
    }
}
