//! somnolog - sleep log with tag-impact analytics
//!
//! Records nights of sleep with a quality rating and free-form tags, then
//! shows which tags go with better or worse nights.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_DATA_HOME/somnolog/logs.json (~/.local/share/somnolog/logs.json)
//! - Diagnostics: $XDG_STATE_HOME/somnolog/somnolog.YYYY-MM-DD.log (~/.local/state/somnolog/)
//! - Config: $XDG_CONFIG_HOME/somnolog/config.toml (~/.config/somnolog/config.toml)

mod render;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use somnolog_core::analytics::{
    by_incidence, common_tags, filter_by_query, impact_for_tag, impacts_for,
    min_sample_threshold, mixed_incidence, needs_last_night_entry, top_negative, top_positive,
    DailyTrend, ImpactKey, MonthSummary, OverallAverages, RangeFilter, RankingOptions,
    TagComparison, TagHeatmap, TagImpact, WindowSummary,
};
use somnolog_core::format::{format_relative_time, parse_tags};
use somnolog_core::store::{export_logs, import_file};
use somnolog_core::{parse_timestamp, Config, LogStore, LogUpdate, NewSleepLog, SleepLog};

use crate::render::{CompareReport, StatsReport, SummaryReport, TagReport};

/// Window sizes shown by `somnolog summary`.
const SUMMARY_WINDOWS: [usize; 2] = [7, 28];

#[derive(Parser)]
#[command(name = "somnolog")]
#[command(about = "Track sleep and see which tags go with better nights")]
#[command(version)]
struct Args {
    /// Log collection to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Which logs a report looks at
#[derive(ClapArgs, Debug, Clone, Default)]
struct RangeArgs {
    /// Only logs started in the last N days (0 or non-numeric: all logs)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    days: Option<String>,

    /// First day of an explicit range (YYYY-MM-DD, local time)
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of an explicit range (YYYY-MM-DD, local time)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    /// Include every log
    #[arg(long, conflicts_with_all = ["days", "from", "to"])]
    all: bool,
}

impl RangeArgs {
    /// Resolve the flags, falling back to a trailing window of `default_days`
    /// (0 means all logs).
    fn filter(&self, default_days: u32) -> RangeFilter {
        if self.all {
            return RangeFilter::All;
        }
        match (&self.days, self.from, self.to) {
            (Some(days), _, _) => RangeFilter::trailing_days_from_input(days),
            (None, Some(from), Some(to)) => RangeFilter::Between { from, to },
            _ if default_days == 0 => RangeFilter::All,
            _ => RangeFilter::TrailingDays(default_days),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Record a night of sleep
    Add {
        /// When sleep started (RFC 3339, or "YYYY-MM-DD HH:MM" local time)
        #[arg(long)]
        start: String,

        /// When sleep ended
        #[arg(long)]
        end: Option<String>,

        /// Quality rating, 1-10
        #[arg(short, long)]
        quality: Option<u8>,

        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
    },

    /// Change fields of a logged night
    Edit {
        /// Log id (a unique prefix is enough)
        id: String,

        /// New start time
        #[arg(long)]
        start: Option<String>,

        /// New end time
        #[arg(long, conflicts_with = "clear_end")]
        end: Option<String>,

        /// Remove the end time
        #[arg(long)]
        clear_end: bool,

        /// New quality rating, 1-10
        #[arg(short, long, conflicts_with = "clear_quality")]
        quality: Option<u8>,

        /// Remove the quality rating
        #[arg(long)]
        clear_quality: bool,

        /// Replace all tags (comma-separated, empty clears them)
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// List logged nights, newest first
    List {
        /// Show at most N logs
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Delete a logged night
    Remove {
        /// Log id (a unique prefix is enough)
        id: String,
    },

    /// Delete every logged night
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Import logs from a JSON file, skipping overlapping nights
    Import {
        /// JSON array of logs, or an object with a `logs` array
        path: PathBuf,
    },

    /// Export all logs to a JSON file
    Export {
        /// Destination file
        path: PathBuf,
    },

    /// Averages, trend and the tags with the strongest effect
    Stats {
        #[command(flatten)]
        range: RangeArgs,

        /// Minimum logs per tag for the rankings (at least 3)
        #[arg(long)]
        min_sample: Option<String>,
    },

    /// List tags by how often they are used, or maintain them
    Tags {
        #[command(subcommand)]
        action: Option<TagsAction>,

        /// Only tags containing this text (case-insensitive)
        #[arg(short, long)]
        query: Option<String>,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Impact and heatmaps for one tag
    Tag {
        /// Tag name
        name: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Two tags side by side (default: the two most common)
    Compare {
        /// First tag
        left: Option<String>,

        /// Second tag
        right: Option<String>,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Recent weeks against the all-time averages
    Summary,

    /// One calendar month
    Month {
        /// Month as YYYY-MM (default: the current month)
        month: Option<String>,
    },
}

#[derive(Subcommand)]
enum TagsAction {
    /// Rename a tag on every log
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Remove a tag from every log
    Delete {
        /// Tag name
        tag: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        somnolog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let logs_path = args.file.clone().unwrap_or_else(|| config.logs_path());
    tracing::info!(path = %logs_path.display(), "Opening log store");

    let mut store = LogStore::open(&logs_path)
        .with_context(|| format!("failed to open log collection {}", logs_path.display()))?;

    let format = args.format;
    match args.command {
        Command::Add {
            start,
            end,
            quality,
            tags,
        } => cmd_add(&mut store, &start, end.as_deref(), quality, &tags),
        Command::Edit {
            id,
            start,
            end,
            clear_end,
            quality,
            clear_quality,
            tags,
        } => {
            let update = LogUpdate {
                start: start.as_deref().map(parse_when).transpose()?,
                end: if clear_end {
                    Some(None)
                } else {
                    end.as_deref().map(parse_when).transpose()?.map(Some)
                },
                quality: if clear_quality {
                    Some(None)
                } else {
                    quality.map(Some)
                },
                tags: tags.as_deref().map(parse_tags),
            };
            cmd_edit(&mut store, &id, update)
        }
        Command::List { limit, range } => cmd_list(&store, &range, limit, format),
        Command::Remove { id } => cmd_remove(&mut store, &id),
        Command::Clear { yes } => cmd_clear(&mut store, yes),
        Command::Import { path } => cmd_import(&mut store, &path),
        Command::Export { path } => cmd_export(&store, &path),
        Command::Stats { range, min_sample } => {
            cmd_stats(&store, &config, &range, min_sample.as_deref(), format)
        }
        Command::Tags {
            action,
            query,
            range,
        } => match action {
            Some(TagsAction::Rename { old, new }) => cmd_rename_tag(&mut store, &old, &new),
            Some(TagsAction::Delete { tag }) => cmd_delete_tag(&mut store, &tag),
            None => cmd_tags(&store, query.as_deref().unwrap_or(""), &range, format),
        },
        Command::Tag { name, range } => cmd_tag(&store, &name, &range, format),
        Command::Compare { left, right, range } => {
            cmd_compare(&store, left, right, &range, format)
        }
        Command::Summary => cmd_summary(&store, &config, format),
        Command::Month { month } => cmd_month(&store, month.as_deref(), format),
    }
}

// ============================================
// Input helpers
// ============================================

/// Parse RFC 3339, or a local "YYYY-MM-DD HH:MM".
fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    if let Some(ts) = parse_timestamp(input) {
        return Ok(ts);
    }
    for pattern in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input.trim(), pattern) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("'{}' does not exist in the local time zone", input));
        }
    }
    bail!(
        "could not parse time '{}': use RFC 3339 or \"YYYY-MM-DD HH:MM\"",
        input
    )
}

/// Parse "YYYY-MM".
fn parse_month(input: &str) -> Result<(i32, u32)> {
    let (year, month) = input
        .trim()
        .split_once('-')
        .with_context(|| format!("expected YYYY-MM, got '{}'", input))?;
    let year: i32 = year
        .parse()
        .with_context(|| format!("invalid year in '{}'", input))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("invalid month in '{}'", input))?;
    if !(1..=12).contains(&month) {
        bail!("month must be between 01 and 12, got '{}'", input);
    }
    Ok((year, month))
}

/// Find a log by exact id or unique id prefix.
fn resolve_id(store: &LogStore, id: &str) -> Result<String> {
    if store.get(id).is_some() {
        return Ok(id.to_string());
    }

    let matches: Vec<&SleepLog> = store
        .logs()
        .iter()
        .filter(|l| l.id.starts_with(id))
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => bail!("No log found matching '{}'", id),
        _ => bail!("'{}' matches {} logs; use a longer id", id, matches.len()),
    }
}

fn owned(impacts: Vec<&TagImpact>) -> Vec<TagImpact> {
    impacts.into_iter().cloned().collect()
}

/// Print `report` as pretty JSON or through its text renderer.
fn emit<T: Serialize>(format: OutputFormat, report: &T, text: impl Fn(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => print!("{}", text(report)),
    }
    Ok(())
}

// ============================================
// Log management
// ============================================

fn cmd_add(
    store: &mut LogStore,
    start: &str,
    end: Option<&str>,
    quality: Option<u8>,
    tags: &str,
) -> Result<()> {
    let new = NewSleepLog {
        start: parse_when(start)?,
        end: end.map(parse_when).transpose()?,
        quality,
        tags: parse_tags(tags),
    };
    let log = store.add(new).context("failed to add log")?;

    println!("Added {}", log.id);
    println!("{}", render::log_line(log, &Local));
    Ok(())
}

fn cmd_edit(store: &mut LogStore, id: &str, update: LogUpdate) -> Result<()> {
    let id = resolve_id(store, id)?;
    let log = store.update(&id, update).context("failed to update log")?;

    println!("Updated {}", log.id);
    println!("{}", render::log_line(log, &Local));
    Ok(())
}

fn cmd_list(
    store: &LogStore,
    range: &RangeArgs,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut logs = range.filter(0).apply(store.logs(), Utc::now(), &Local);
    logs.sort_by(|a, b| b.start.cmp(&a.start));
    if let Some(limit) = limit {
        logs.truncate(limit);
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    if logs.is_empty() {
        println!("No logs found.");
        return Ok(());
    }
    for log in &logs {
        println!("{}", render::log_line(log, &Local));
    }
    Ok(())
}

fn cmd_remove(store: &mut LogStore, id: &str) -> Result<()> {
    let id = resolve_id(store, id)?;
    store.remove(&id).context("failed to remove log")?;
    println!("Removed {}", id);
    Ok(())
}

fn cmd_clear(store: &mut LogStore, yes: bool) -> Result<()> {
    let count = store.len();
    if !yes && count > 0 {
        bail!("Refusing to delete {} logs without --yes", count);
    }
    store.clear().context("failed to clear logs")?;
    println!("Cleared {} logs", count);
    Ok(())
}

fn cmd_import(store: &mut LogStore, path: &Path) -> Result<()> {
    let summary = import_file(store, path)
        .with_context(|| format!("failed to import {}", path.display()))?;

    println!("Import from {}:", path.display());
    println!("  Added:       {}", summary.added);
    println!("  Overlapping: {}", summary.skipped);
    println!("  Unreadable:  {}", summary.malformed);
    Ok(())
}

fn cmd_export(store: &LogStore, path: &Path) -> Result<()> {
    export_logs(store, path).with_context(|| format!("failed to export to {}", path.display()))?;
    println!("Exported {} logs to {}", store.len(), path.display());
    Ok(())
}

fn cmd_rename_tag(store: &mut LogStore, old: &str, new: &str) -> Result<()> {
    let changed = store.rename_tag(old, new).context("failed to rename tag")?;
    if changed == 0 {
        println!("No logs tagged '{}'", old);
    } else {
        println!("Renamed '{}' to '{}' on {} logs", old, new.trim(), changed);
    }
    Ok(())
}

fn cmd_delete_tag(store: &mut LogStore, tag: &str) -> Result<()> {
    let changed = store.delete_tag(tag).context("failed to delete tag")?;
    if changed == 0 {
        println!("No logs tagged '{}'", tag);
    } else {
        println!("Removed '{}' from {} logs", tag, changed);
    }
    Ok(())
}

// ============================================
// Reports
// ============================================

fn cmd_stats(
    store: &LogStore,
    config: &Config,
    range: &RangeArgs,
    min_sample: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let analytics = &config.analytics;
    let filter = range.filter(analytics.default_range_days);
    let logs = filter.apply(store.logs(), Utc::now(), &Local);
    let min_sample = min_sample
        .map(min_sample_threshold)
        .unwrap_or(analytics.min_sample_size);

    let impacts = impacts_for(&logs);
    let quality = RankingOptions {
        key: ImpactKey::Quality,
        limit: analytics.top_count,
        min_count: min_sample,
    };
    let combined = RankingOptions {
        key: ImpactKey::Combined,
        ..quality
    };

    tracing::debug!(
        range = %filter.describe(),
        logs = logs.len(),
        tags = impacts.len(),
        "Computing statistics"
    );

    let report = StatsReport {
        range: filter.describe(),
        logs: logs.len(),
        min_sample,
        averages: OverallAverages::compute(&logs),
        trend: DailyTrend::build(&logs, &Local, analytics.trend_days),
        top_positive: owned(top_positive(&impacts, quality)),
        top_negative: owned(top_negative(&impacts, quality)),
        common_with_effect: owned(mixed_incidence(
            &impacts,
            ImpactKey::Quality,
            analytics.top_count,
        )),
        combined_positive: owned(top_positive(&impacts, combined)),
        combined_negative: owned(top_negative(&impacts, combined)),
    };
    emit(format, &report, StatsReport::render)
}

fn cmd_tags(store: &LogStore, query: &str, range: &RangeArgs, format: OutputFormat) -> Result<()> {
    let logs = range.filter(0).apply(store.logs(), Utc::now(), &Local);
    let impacts = impacts_for(&logs);
    let matching = owned(filter_by_query(&impacts, query));
    let ranked = owned(by_incidence(&matching));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ranked)?),
        OutputFormat::Text => {
            if ranked.is_empty() {
                println!("No tags found.");
            }
            for impact in &ranked {
                println!("{}", render::impact_row(impact));
            }
        }
    }
    Ok(())
}

fn cmd_tag(store: &LogStore, name: &str, range: &RangeArgs, format: OutputFormat) -> Result<()> {
    let filter = range.filter(0);
    let logs = filter.apply(store.logs(), Utc::now(), &Local);
    if !logs.iter().any(|l| l.has_tag(name)) {
        bail!("No logs tagged '{}' ({})", name, filter.describe());
    }

    let heatmap = TagHeatmap::build(&logs, name, &Local);
    let report = TagReport {
        range: filter.describe(),
        impact: impact_for_tag(&logs, name),
        scale_max: heatmap.scale_max(),
        heatmap,
    };
    emit(format, &report, TagReport::render)
}

fn cmd_compare(
    store: &LogStore,
    left: Option<String>,
    right: Option<String>,
    range: &RangeArgs,
    format: OutputFormat,
) -> Result<()> {
    let filter = range.filter(0);
    let logs = filter.apply(store.logs(), Utc::now(), &Local);
    let common = common_tags(&logs, 2);

    let left = match left {
        Some(tag) => tag,
        None => common
            .first()
            .map(|i| i.tag.clone())
            .context("No tags to compare yet")?,
    };
    let right = match right {
        Some(tag) => tag,
        None => common
            .iter()
            .map(|i| i.tag.clone())
            .find(|t| *t != left)
            .context("Need at least two tags to compare")?,
    };

    let comparison = TagComparison::build(&logs, &left, &right, &Local);
    let report = CompareReport {
        range: filter.describe(),
        left: impact_for_tag(&logs, &left),
        right: impact_for_tag(&logs, &right),
        left_heatmap: comparison.left,
        right_heatmap: comparison.right,
        scale_max: comparison.scale_max,
    };
    emit(format, &report, CompareReport::render)
}

fn cmd_summary(store: &LogStore, config: &Config, format: OutputFormat) -> Result<()> {
    let logs = store.logs();
    let now = Utc::now();
    let report = SummaryReport {
        logs: logs.len(),
        needs_last_night: needs_last_night_entry(logs, now),
        last_entry: logs
            .iter()
            .map(|l| l.start)
            .max()
            .map(|start| format_relative_time(start, now)),
        overall: OverallAverages::compute(logs),
        windows: SUMMARY_WINDOWS
            .iter()
            .map(|&n| WindowSummary::recent(logs, n))
            .collect(),
        common_tags: common_tags(logs, config.analytics.incidence_limit),
    };
    emit(format, &report, SummaryReport::render)
}

fn cmd_month(store: &LogStore, month: Option<&str>, format: OutputFormat) -> Result<()> {
    let (year, month) = match month {
        Some(input) => parse_month(input)?,
        None => {
            let today = Local::now();
            (today.year(), today.month())
        }
    };

    let summary = MonthSummary::build(store.logs(), year, month, &Local)
        .with_context(|| format!("invalid month {}-{:02}", year, month))?;
    emit(format, &summary, render::month)
}
