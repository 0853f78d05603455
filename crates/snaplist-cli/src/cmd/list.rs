//! `snapls list`: one page of snapshots from a fixture.

use crate::output::{
    OutputMode, listing_failure, pretty_kv, pretty_rule, pretty_section, render_mode,
};
use anyhow::Context;
use chrono::{DateTime, SecondsFormat};
use clap::Args;
use serde::Serialize;
use snaplist_core::config::ListingConfig;
use snaplist_core::{
    ErrorCode, InMemorySource, ListingError, ListingRequest, SnapshotInfo, SnapshotsPage,
    SortKey, list_snapshots,
};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// JSON fixture describing the repositories.
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// Sort key: start_time, name, duration, index_count, shard_count,
    /// failed_shard_count, repository.
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Sort order: asc or desc.
    #[arg(short, long)]
    pub order: Option<String>,

    /// Page size, or -1 for everything.
    #[arg(short = 'n', long, allow_hyphen_values = true)]
    pub size: Option<i32>,

    /// Matches to skip before the page.
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<i32>,

    /// `next` token from a previous page.
    #[arg(long)]
    pub after: Option<String>,

    /// Start the listing at this sort value (inclusive).
    #[arg(long)]
    pub from_sort_value: Option<String>,

    /// Repositories to list (repeatable, comma-separated). Default: all.
    #[arg(short, long)]
    pub repository: Vec<String>,
}

impl ListArgs {
    /// Query parameters for this invocation, with config defaults filled in.
    fn query(&self, config: &ListingConfig) -> Vec<(&'static str, String)> {
        let mut params = vec![
            (
                "sort",
                self.sort
                    .clone()
                    .unwrap_or_else(|| config.default_sort.as_str().to_string()),
            ),
            (
                "order",
                self.order
                    .clone()
                    .unwrap_or_else(|| config.default_order.as_str().to_string()),
            ),
            ("size", self.size.unwrap_or(config.default_size).to_string()),
        ];
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(after) = &self.after {
            params.push(("after", after.clone()));
        }
        if let Some(from) = &self.from_sort_value {
            params.push(("from_sort_value", from.clone()));
        }
        for repository in &self.repository {
            params.push(("repository", repository.clone()));
        }
        params
    }

    fn request(&self, config: &ListingConfig) -> Result<ListingRequest, ListingError> {
        let params = self.query(config);
        ListingRequest::from_query(params.iter().map(|(key, value)| (*key, value.as_str())))
    }
}

#[derive(Debug, Serialize)]
pub struct SnapshotRow {
    pub repository: String,
    pub snapshot: String,
    pub uuid: String,
    pub state: String,
    pub start_time: String,
    pub duration_ms: i64,
    pub indices: usize,
    pub shards: u32,
    pub failed_shards: u32,
    pub sort_value: String,
}

impl SnapshotRow {
    fn new(info: &SnapshotInfo, sort: SortKey) -> Self {
        Self {
            repository: info.repository.clone(),
            snapshot: info.name().to_string(),
            uuid: info.snapshot.uuid.clone(),
            state: info.state.to_string(),
            start_time: format_millis(info.start_time),
            duration_ms: info.duration(),
            indices: info.index_count(),
            shards: info.total_shards,
            failed_shards: info.failed_shards,
            sort_value: sort.render_value(info),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub sort: String,
    pub order: String,
    pub snapshots: Vec<SnapshotRow>,
    pub total: u64,
    pub remaining: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failures: BTreeMap<String, String>,
}

impl ListOutput {
    fn new(request: &ListingRequest, page: SnapshotsPage) -> Self {
        Self {
            sort: request.sort.to_string(),
            order: request.order.to_string(),
            snapshots: page
                .snapshots
                .iter()
                .map(|info| SnapshotRow::new(info, request.sort))
                .collect(),
            total: page.total,
            remaining: page.remaining,
            next: page.next,
            failures: page.failures,
        }
    }
}

/// Epoch millis as RFC 3339, or the raw number when out of range.
fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |at| at.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

pub fn run_list(args: &ListArgs, config: &ListingConfig, output: OutputMode) -> anyhow::Result<()> {
    let request = args
        .request(config)
        .map_err(|err| listing_failure(output, err))?;
    let source = InMemorySource::from_fixture_path(&args.fixture)
        .with_context(|| format!("Failed to load fixture {}", args.fixture.display()))?;

    let page = list_snapshots(&source, &request, &config.options())
        .map_err(|err| listing_failure(output, err))?;
    for (repository, reason) in &page.failures {
        tracing::warn!(
            code = %ErrorCode::RepositoryUnavailable,
            repository = %repository,
            reason = %reason,
            "repository skipped"
        );
    }

    let result = ListOutput::new(&request, page);
    render_mode(output, &result, render_text, render_pretty)
}

fn render_text(result: &ListOutput, w: &mut dyn Write) -> io::Result<()> {
    if !result.snapshots.is_empty() {
        writeln!(w, "REPOSITORY  SNAPSHOT  STATE  START  {}", result.sort.to_uppercase())?;
    }
    for row in &result.snapshots {
        writeln!(
            w,
            "{}  {}  {}  {}  {}",
            row.repository, row.snapshot, row.state, row.start_time, row.sort_value
        )?;
    }
    writeln!(w, "total={} remaining={}", result.total, result.remaining)?;
    if let Some(next) = &result.next {
        writeln!(w, "next={next}")?;
    }
    for (repository, reason) in &result.failures {
        writeln!(w, "failed={repository}: {reason}")?;
    }
    Ok(())
}

fn render_pretty(result: &ListOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Snapshots by {} {} ({} of {})",
            result.sort,
            result.order,
            result.snapshots.len(),
            result.total
        ),
    )?;
    if result.snapshots.is_empty() {
        writeln!(w, "(no snapshots)")?;
    }
    for row in &result.snapshots {
        writeln!(
            w,
            "{:<16} {:<24} {:<12} {}  [{}]",
            row.repository, row.snapshot, row.state, row.start_time, row.sort_value
        )?;
    }
    pretty_rule(w)?;
    pretty_kv(w, "remaining", result.remaining.to_string())?;
    if let Some(next) = &result.next {
        pretty_kv(w, "next", next)?;
    }
    for (repository, reason) in &result.failures {
        pretty_kv(w, "unavailable", format!("{repository} ({reason})"))?;
    }
    Ok(())
}
