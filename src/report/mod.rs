use crate::activity::{Action, ActivityReport, Issue, PullRequest};
use colored::Colorize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format of the activity report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Indented text, colored when printed to the terminal
    #[default]
    Text,
    Markdown,
    Json,
}

/// Render the report and print it to stdout, or write it to `output_path`.
/// Colors are only used for text printed to the terminal.
#[instrument(skip(report), fields(repositories = report.repositories.len()))]
pub fn output(
    report: &ActivityReport,
    format: Format,
    output_path: Option<&Path>,
) -> Result<(), ReportError> {
    let rendered = match format {
        Format::Text => render_text(report, output_path.is_none()),
        Format::Markdown => render_markdown(report),
        Format::Json => render_json(report)?,
    };

    match output_path {
        None => {
            debug!("writing report to terminal");
            print!("{rendered}");
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            std::fs::write(path, rendered)?;
        }
    }
    Ok(())
}

/// Plain hierarchy: repositories, then their pull requests and issues, each
/// followed by its actions in stored order.
///
/// - octo/spoon
///   - PR #12 (by octocat) Fix spoon bending, fixing issues #3, #5
///     - PR opened by octocat at 2024-02-01 09:00 UTC
pub fn render_text(report: &ActivityReport, colorize: bool) -> String {
    let paint = |text: String, style: fn(&str) -> colored::ColoredString| {
        if colorize {
            style(&text).to_string()
        } else {
            text
        }
    };

    let mut out = String::new();
    if report.repositories.is_empty() {
        out.push_str("No pull request or issue activity found.\n");
        return out;
    }

    for repo in report.repositories.values() {
        let _ = writeln!(out, "- {}", paint(repo.name.clone(), |s| s.bold()));
        for pr in repo.pull_requests.values() {
            let mut line = format!(
                "  - {} (by {}) {}",
                paint(format!("PR #{}", pr.number), |s| s.cyan()),
                pr.creator,
                pr.title
            );
            if !pr.linked_issues.is_empty() {
                let fixes = format!("fixing issues {}", issue_list(&pr.linked_issues));
                let _ = write!(line, ", {}", paint(fixes, |s| s.green()));
            }
            let _ = writeln!(out, "{line}");
            write_text_actions(&mut out, &pr.actions);
        }
        for issue in repo.issues.values() {
            let _ = writeln!(
                out,
                "  - {} (by {}) {}",
                paint(format!("Issue #{}", issue.number), |s| s.yellow()),
                issue.creator,
                issue.title
            );
            write_text_actions(&mut out, &issue.actions);
        }
    }
    out
}

fn write_text_actions(out: &mut String, actions: &[Action]) {
    for action in actions {
        let _ = writeln!(out, "    - {}", describe_action(action));
    }
}

/// Same hierarchy as markdown headings and lists.
pub fn render_markdown(report: &ActivityReport) -> String {
    let mut md = String::from("# GitHub activity report\n\n");
    if report.repositories.is_empty() {
        md.push_str("No pull request or issue activity found.\n");
        return md;
    }

    for repo in report.repositories.values() {
        let _ = writeln!(md, "## {}\n", repo.name);
        for pr in repo.pull_requests.values() {
            write_markdown_pull_request(&mut md, pr);
        }
        for issue in repo.issues.values() {
            write_markdown_issue(&mut md, issue);
        }
    }
    md
}

fn write_markdown_pull_request(md: &mut String, pr: &PullRequest) {
    let _ = writeln!(md, "### PR #{}: {}\n", pr.number, pr.title);
    let _ = write!(md, "**Author:** {}", pr.creator);
    if !pr.linked_issues.is_empty() {
        let _ = write!(md, " | **Fixes:** {}", issue_list(&pr.linked_issues));
    }
    md.push_str("\n\n");
    write_markdown_actions(md, &pr.actions);
}

fn write_markdown_issue(md: &mut String, issue: &Issue) {
    let _ = writeln!(md, "### Issue #{}: {}\n", issue.number, issue.title);
    let _ = writeln!(md, "**Author:** {}\n", issue.creator);
    write_markdown_actions(md, &issue.actions);
}

fn write_markdown_actions(md: &mut String, actions: &[Action]) {
    for action in actions {
        let _ = writeln!(md, "- {}", describe_action(action));
    }
    md.push('\n');
}

/// The aggregate map as pretty-printed JSON.
pub fn render_json(report: &ActivityReport) -> Result<String, ReportError> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}

fn describe_action(action: &Action) -> String {
    format!(
        "{} by {} at {}",
        action.description,
        action.by,
        action.at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn issue_list(numbers: &BTreeSet<u64>) -> String {
    numbers
        .iter()
        .map(|n| format!("#{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Repository;
    use chrono::{TimeZone, Utc};

    fn sample_report() -> ActivityReport {
        let opened = Action {
            description: "PR opened".to_string(),
            at: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
            by: "octocat".to_string(),
        };
        let commented = Action {
            description: "Issue comment created".to_string(),
            at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 30, 0).unwrap(),
            by: "octocat".to_string(),
        };

        let mut pr = PullRequest::new(12, "Fix spoon bending", "octocat");
        pr.linked_issues = BTreeSet::from([3, 5]);
        pr.actions.push(opened);

        let mut issue = Issue::new(5, "Spoons bend", "monalisa");
        issue.actions.push(commented);

        let mut repo = Repository::new("octo-org/spoon-knife");
        repo.pull_requests.insert(12, pr);
        repo.issues.insert(5, issue);

        let mut report = ActivityReport::default();
        report.repositories.insert(repo.name.clone(), repo);
        report
    }

    #[test]
    fn test_render_text_plain() {
        let text = render_text(&sample_report(), false);
        let expected = "\
- octo-org/spoon-knife
  - PR #12 (by octocat) Fix spoon bending, fixing issues #3, #5
    - PR opened by octocat at 2024-02-01 09:00 UTC
  - Issue #5 (by monalisa) Spoons bend
    - Issue comment created by octocat at 2024-02-01 12:30 UTC
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_text_omits_empty_linked_issues() {
        let mut report = sample_report();
        let repo = report.repositories.get_mut("octo-org/spoon-knife").unwrap();
        repo.pull_requests.get_mut(&12_u64).unwrap().linked_issues.clear();
        let text = render_text(&report, false);
        assert!(text.contains("  - PR #12 (by octocat) Fix spoon bending\n"));
        assert!(!text.contains("fixing issues"));
    }

    #[test]
    fn test_render_empty_report() {
        let report = ActivityReport::default();
        assert!(render_text(&report, false).contains("No pull request or issue activity"));
        assert!(render_markdown(&report).contains("No pull request or issue activity"));
    }

    #[test]
    fn test_render_markdown() {
        let md = render_markdown(&sample_report());
        assert!(md.starts_with("# GitHub activity report"));
        assert!(md.contains("## octo-org/spoon-knife"));
        assert!(md.contains("### PR #12: Fix spoon bending"));
        assert!(md.contains("**Author:** octocat | **Fixes:** #3, #5"));
        assert!(md.contains("### Issue #5: Spoons bend"));
        assert!(md.contains("- Issue comment created by octocat at 2024-02-01 12:30 UTC"));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let pr = &value["repositories"]["octo-org/spoon-knife"]["pull_requests"]["12"];
        assert_eq!(pr["title"], "Fix spoon bending");
        assert_eq!(pr["linked_issues"], serde_json::json!([3, 5]));
        assert_eq!(pr["actions"][0]["by"], "octocat");
    }

    #[test]
    fn test_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        output(&sample_report(), Format::Markdown, Some(&path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("### PR #12"));
    }

    #[test]
    fn test_text_written_to_file_is_uncolored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        output(&sample_report(), Format::Text, Some(&path)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, render_text(&sample_report(), false));
    }

    #[test]
    fn test_output_to_terminal() {
        // Should not panic
        output(&sample_report(), Format::Text, None).unwrap();
    }
}
