use clap::Parser;
use std::path::PathBuf;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use gh_activity_report::github::{
    CachedSource, EventSource, GitHubApi, InlineSnapshot, SnapshotFile,
};
use gh_activity_report::{activity, config, events, report};

/// GitHub Activity Report: fetches a user's public activity events and
/// summarizes them per repository as pull requests and issues with their
/// history.
#[derive(Parser, Debug)]
#[command(name = "gh-activity-report", version, about)]
struct Cli {
    /// GitHub username whose activity is reported (defaults to GAR_USERNAME)
    username: Option<String>,

    /// Config file path (defaults to .gh-activity-report.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raw event snapshot path (defaults to output/initial_events.json)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Fetch events again even if a snapshot exists
    #[arg(long)]
    refresh: bool,

    /// Merge pull-request and comment events into one chronological pass
    #[arg(long)]
    chronological: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = report::Format::Text)]
    format: report::Format,

    /// Optional output file path for the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the built-in sample events for demo purposes (no GitHub token needed)
    #[arg(long)]
    r#mock: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(username) = &cli.username {
        config.github.username = Some(username.clone());
    }
    if let Some(cache) = &cli.cache {
        config.cache.path = cache.clone();
    }
    if cli.chronological {
        config.report.ordering = activity::PassOrdering::Chronological;
    }

    let source: Box<dyn EventSource> = if cli.r#mock {
        info!("using sample events for demo");
        Box::new(InlineSnapshot::new(
            "sample events",
            include_str!("../tests/fixtures/sample_events.json"),
        ))
    } else {
        // both are required even when a snapshot exists
        let username = config.username()?;
        let token = config.token()?;
        Box::new(CachedSource::new(
            SnapshotFile::new(&config.cache.path),
            GitHubApi::new(
                &config.github.api_base_url,
                username,
                token,
                config.github.per_page,
            ),
            cli.refresh,
        ))
    };

    let _main_span = info_span!("activity_report", source = %source.name()).entered();

    info!("loading raw events");
    let raw_events = source.raw_events().await?;
    info!(records = raw_events.len(), "raw events loaded");

    let decoded = events::decode_events(&raw_events);
    if !decoded.rejections.is_empty() {
        warn!(
            rejected = decoded.rejections.len(),
            decoded = decoded.events.len(),
            "some events could not be decoded and were skipped"
        );
    }

    info!(ordering = ?config.report.ordering, "aggregating events");
    let activity_report = activity::aggregate(&decoded.events, config.report.ordering);

    report::output(&activity_report, cli.format, cli.output.as_deref())?;
    info!(repositories = activity_report.repositories.len(), "done");

    Ok(())
}
