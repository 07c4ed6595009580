//! Text rendering of analytics results for the terminal.
//!
//! Every renderer returns a `String` so `main` decides where it goes. JSON
//! output serializes the report structs directly.

use std::fmt::Write;

use chrono::TimeZone;
use serde::Serialize;
use somnolog_core::analytics::{
    Bucket, BucketSeries, DailyTrend, MonthSummary, OverallAverages, Polarity, TagHeatmap,
    TagImpact, WindowSummary, PRESET_DAYS,
};
use somnolog_core::format::{
    format_duration, format_duration_delta, format_opt, format_quality_delta, DurationBand,
    QualityBand,
};
use somnolog_core::SleepLog;

const TAG_WIDTH: usize = 18;

// ============================================
// Reports
// ============================================

/// Everything `somnolog stats` shows.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub range: String,
    pub logs: usize,
    pub min_sample: u32,
    pub averages: OverallAverages,
    pub trend: DailyTrend,
    pub top_positive: Vec<TagImpact>,
    pub top_negative: Vec<TagImpact>,
    pub common_with_effect: Vec<TagImpact>,
    pub combined_positive: Vec<TagImpact>,
    pub combined_negative: Vec<TagImpact>,
}

/// One tag with its heatmap, for `somnolog tag`.
#[derive(Debug, Serialize)]
pub struct TagReport {
    pub range: String,
    pub impact: TagImpact,
    pub heatmap: TagHeatmap,
    pub scale_max: u32,
}

/// Two tags side by side on a shared heatmap scale.
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub range: String,
    pub left: TagImpact,
    pub right: TagImpact,
    pub left_heatmap: TagHeatmap,
    pub right_heatmap: TagHeatmap,
    pub scale_max: u32,
}

/// Overview for `somnolog summary`.
#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub logs: usize,
    pub needs_last_night: bool,
    /// When the most recent log started, relative to now
    pub last_entry: Option<String>,
    pub overall: OverallAverages,
    pub windows: Vec<WindowSummary>,
    pub common_tags: Vec<TagImpact>,
}

// ============================================
// Building blocks
// ============================================

fn quality_text(value: f64, samples: u32) -> String {
    if samples == 0 {
        "-".to_string()
    } else {
        format!("{:.1}", value)
    }
}

fn duration_text(value: f64, samples: u32) -> String {
    if samples == 0 {
        "-".to_string()
    } else {
        format_duration(value)
    }
}

/// One line describing a stored log.
pub fn log_line<Tz: TimeZone>(log: &SleepLog, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let start = log.start.with_timezone(tz).format("%Y-%m-%d %H:%M");
    let duration = format_opt(log.duration_hours(), format_duration);
    let quality = log
        .quality
        .map(|q| format!("q{}", q))
        .unwrap_or_else(|| "q-".to_string());
    let short_id: String = log.id.chars().take(8).collect();

    let mut line = format!("{:<8}  {}  {:>7}  {:>3}", short_id, start, duration, quality);
    if !log.tags.is_empty() {
        let _ = write!(line, "  [{}]", log.tags.join(", "));
    }
    line
}

/// One ranked tag: quality delta, duration delta and sample size.
pub fn impact_row(impact: &TagImpact) -> String {
    let dq = if impact.has_quality_data() {
        format_quality_delta(impact.delta_quality)
    } else {
        "n/a".to_string()
    };
    let dd = if impact.has_duration_data() {
        format_duration_delta(impact.delta_duration)
    } else {
        "n/a".to_string()
    };
    let noun = if impact.count == 1 { "log" } else { "logs" };
    format!(
        "  {:<width$} {:>5} quality  {:>9} sleep  ({} {})",
        impact.tag,
        dq,
        dd,
        impact.count,
        noun,
        width = TAG_WIDTH
    )
}

fn impact_section(out: &mut String, title: &str, impacts: &[TagImpact]) {
    let _ = writeln!(out, "{}:", title);
    if impacts.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for impact in impacts {
        let _ = writeln!(out, "{}", impact_row(impact));
    }
    let _ = writeln!(out);
}

/// Average duration and quality with their bands.
pub fn averages(averages: &OverallAverages) -> String {
    let duration = (averages.duration_samples > 0).then_some(averages.avg_duration);
    let quality = (averages.quality_samples > 0).then_some(averages.avg_quality);
    format!(
        "Average duration: {} ({})\nAverage quality:  {} ({})\n",
        duration_text(averages.avg_duration, averages.duration_samples),
        DurationBand::of(duration).label(),
        quality_text(averages.avg_quality, averages.quality_samples),
        QualityBand::of(quality).label(),
    )
}

/// Per-date table, or a note when there is nothing to chart.
pub fn trend(trend: &DailyTrend) -> String {
    let mut out = String::new();
    let chartable = DailyTrend::is_chartable(&trend.durations())
        || DailyTrend::is_chartable(&trend.qualities());
    if !chartable {
        let _ = writeln!(out, "Trend: not enough data yet");
        return out;
    }

    let _ = writeln!(out, "Trend ({} dates):", trend.points.len());
    for point in &trend.points {
        let _ = writeln!(
            out,
            "  {}  {:>7}  {:>4}",
            point.date,
            format_opt(point.avg_duration, format_duration),
            format_opt(point.avg_quality, |q| format!("{:.1}", q)),
        );
    }
    out
}

fn polarity_marker(polarity: Option<Polarity>) -> char {
    match polarity {
        None => '.',
        Some(Polarity::Positive) => '+',
        Some(Polarity::Negative) => '-',
        Some(Polarity::Neutral) => '=',
    }
}

/// Shade for a cell intensity in `0.0..=1.0`.
fn shade(intensity: f64) -> char {
    match intensity {
        i if i <= 0.0 => ' ',
        i if i < 0.4 => '░',
        i if i < 0.7 => '▒',
        i if i < 0.9 => '▓',
        _ => '█',
    }
}

fn series_block(out: &mut String, series: &BucketSeries, scale_max: u32) {
    let bucket: Bucket = series.bucket;
    let cells = series.cells(scale_max);

    let _ = writeln!(out, "{}", bucket.title());
    let mut labels = String::from("       ");
    let mut counts = String::from("  n    ");
    let mut shades = String::from("       ");
    let mut marks = String::from("  vs   ");
    for (label, cell) in bucket.labels().iter().zip(&cells) {
        let _ = write!(labels, "{:>4}", label);
        let _ = write!(counts, "{:>4}", cell.count);
        let _ = write!(shades, "{:>4}", shade(cell.intensity));
        let _ = write!(marks, "{:>4}", polarity_marker(cell.polarity));
    }
    for row in [labels, counts, shades, marks] {
        let _ = writeln!(out, "{}", row.trim_end());
    }
}

/// The three heatmaps of a tag on a given scale.
pub fn heatmap(heatmap: &TagHeatmap, scale_max: u32) -> String {
    let mut out = String::new();
    for series in heatmap.series() {
        series_block(&mut out, series, scale_max);
        let _ = writeln!(out);
    }
    out
}

fn impact_detail(out: &mut String, impact: &TagImpact) {
    let _ = writeln!(out, "Tag: {} ({} logs)", impact.tag, impact.count);
    let _ = writeln!(
        out,
        "  Quality:  {}  ({} vs nights without)",
        quality_text(impact.avg_quality, impact.quality_samples),
        format_quality_delta(impact.delta_quality)
    );
    let _ = writeln!(
        out,
        "  Duration: {}  ({} vs nights without)",
        duration_text(impact.avg_duration, impact.duration_samples),
        format_duration_delta(impact.delta_duration)
    );
}

// ============================================
// Report renderers
// ============================================

impl StatsReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Sleep statistics ({}, {} logs)", self.range, self.logs);
        let _ = writeln!(out);
        if self.logs == 0 {
            let hint: Vec<String> = PRESET_DAYS
                .iter()
                .map(|days| format!("--days {}", days))
                .collect();
            let _ = writeln!(
                out,
                "No logs in this range. Try {} or --all.",
                hint.join(", ")
            );
            return out;
        }

        out.push_str(&averages(&self.averages));
        let _ = writeln!(out);
        out.push_str(&trend(&self.trend));
        let _ = writeln!(out);

        let min = format!("min {} logs", self.min_sample);
        impact_section(&mut out, &format!("Top positive ({})", min), &self.top_positive);
        impact_section(&mut out, &format!("Top negative ({})", min), &self.top_negative);
        impact_section(&mut out, "Common tags with a clear effect", &self.common_with_effect);
        impact_section(&mut out, "Combined score, positive", &self.combined_positive);
        impact_section(&mut out, "Combined score, negative", &self.combined_negative);
        out
    }
}

impl TagReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        impact_detail(&mut out, &self.impact);
        let _ = writeln!(out, "  Range:    {}", self.range);
        let _ = writeln!(out);
        out.push_str(&heatmap(&self.heatmap, self.scale_max));
        out
    }
}

impl CompareReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Comparing {} and {} ({})",
            self.left.tag, self.right.tag, self.range
        );
        let _ = writeln!(out);
        impact_detail(&mut out, &self.left);
        impact_detail(&mut out, &self.right);
        let _ = writeln!(out);
        let _ = writeln!(out, "== {} ==", self.left.tag);
        out.push_str(&heatmap(&self.left_heatmap, self.scale_max));
        let _ = writeln!(out, "== {} ==", self.right.tag);
        out.push_str(&heatmap(&self.right_heatmap, self.scale_max));
        out
    }
}

fn window_block(out: &mut String, window: &WindowSummary) {
    let _ = writeln!(out, "Last {} nights ({} logged):", window.window, window.logs);
    let _ = writeln!(
        out,
        "  Duration: {} ({} vs overall)",
        duration_text(window.averages.avg_duration, window.averages.duration_samples),
        format_duration_delta(window.duration_vs_overall)
    );
    let _ = writeln!(
        out,
        "  Quality:  {} ({} vs overall)",
        quality_text(window.averages.avg_quality, window.averages.quality_samples),
        format_quality_delta(window.quality_vs_overall)
    );
    if let Some(best) = &window.most_positive {
        let _ = writeln!(
            out,
            "  Best tag:  {} ({})",
            best.tag,
            format_quality_delta(best.delta_quality)
        );
    }
    if let Some(worst) = &window.most_negative {
        let _ = writeln!(
            out,
            "  Worst tag: {} ({})",
            worst.tag,
            format_quality_delta(worst.delta_quality)
        );
    }
}

impl SummaryReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.needs_last_night {
            let _ = writeln!(out, "No entry for last night yet. Add one with `somnolog add`.");
            let _ = writeln!(out);
        }
        if self.logs == 0 {
            let _ = writeln!(out, "No logs yet.");
            return out;
        }

        let _ = writeln!(out, "All time ({} logs):", self.logs);
        if let Some(last) = &self.last_entry {
            let _ = writeln!(out, "  Last entry: {}", last);
        }
        out.push_str(&averages(&self.overall));
        let _ = writeln!(out);
        for window in &self.windows {
            window_block(&mut out, window);
            let _ = writeln!(out);
        }
        impact_section(&mut out, "Most common tags", &self.common_tags);
        out
    }
}

/// Month overview: averages, the days with data and the top tags.
pub fn month(summary: &MonthSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}-{:02} ({} logs)",
        summary.year, summary.month, summary.logs
    );
    let _ = writeln!(out);
    if summary.logs == 0 {
        let _ = writeln!(out, "No logs this month.");
        return out;
    }

    out.push_str(&averages(&summary.averages));
    let _ = writeln!(out);

    let _ = writeln!(out, "Days:");
    let days = summary.daily_duration.iter().zip(&summary.daily_quality);
    for (day, (duration, quality)) in days.enumerate() {
        if duration.is_none() && quality.is_none() {
            continue;
        }
        let _ = writeln!(
            out,
            "  {:>2}  {:>7}  {:>4}",
            day + 1,
            format_opt(*duration, format_duration),
            format_opt(*quality, |q| format!("{:.1}", q)),
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Top tags this month:");
    if summary.top_tags.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for tag in &summary.top_tags {
        let _ = writeln!(
            out,
            "{}  [{} this month]",
            impact_row(&tag.impact),
            tag.month_count
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn impact(tag: &str, count: u32, dq: f64, dd: f64) -> TagImpact {
        TagImpact {
            tag: tag.to_string(),
            count,
            avg_quality: 7.0,
            avg_duration: 7.5,
            delta_quality: dq,
            delta_duration: dd,
            quality_samples: count,
            duration_samples: count,
        }
    }

    #[test]
    fn test_log_line() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap();
        let log = SleepLog::new("0123456789", start)
            .with_end(start + Duration::minutes(450))
            .with_quality(7)
            .with_tags(["sport", "tea"]);

        let line = log_line(&log, &Utc);
        assert!(line.starts_with("01234567  2024-05-01 22:00"));
        assert!(line.contains("7h 30m"));
        assert!(line.contains("q7"));
        assert!(line.ends_with("[sport, tea]"));
    }

    #[test]
    fn test_impact_row() {
        let row = impact_row(&impact("sport", 3, 1.5, -0.5));
        assert!(row.contains("sport"));
        assert!(row.contains("+1.5 quality"));
        assert!(row.contains("-0h 30m sleep"));
        assert!(row.ends_with("(3 logs)"));

        let mut unrated = impact("nap", 1, -5.0, 0.0);
        unrated.quality_samples = 0;
        let row = impact_row(&unrated);
        assert!(row.contains("n/a quality"));
        assert!(row.ends_with("(1 log)"));
    }

    #[test]
    fn test_averages_without_data() {
        let text = averages(&OverallAverages::default());
        assert!(text.contains("Average duration: - (no data)"));
        assert!(text.contains("Average quality:  - (no data)"));
    }

    #[test]
    fn test_trend_needs_two_distinct_points() {
        assert!(trend(&DailyTrend::default()).contains("not enough data"));
    }

    #[test]
    fn test_heatmap_rows() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap(); // Monday
        let logs = vec![
            SleepLog::new("a", start).with_quality(9).with_tags(["sport"]),
            SleepLog::new("b", start + Duration::days(1)).with_quality(3),
        ];
        let map = TagHeatmap::build(&logs, "sport", &Utc);
        let text = heatmap(&map, map.scale_max());

        assert!(text.contains("Day of week"));
        assert!(text.contains("Month of year"));
        let week = text.lines().skip(1).take(4).collect::<Vec<_>>();
        assert!(week[0].contains("Su  Mo  Tu"));
        assert_eq!(week[1].trim(), "n       0   1   0   0   0   0   0");
        assert!(week[3].contains('+'));
    }

    #[test]
    fn test_month_lists_only_days_with_data() {
        let start = Utc.with_ymd_and_hms(2024, 2, 10, 22, 0, 0).unwrap();
        let logs = vec![SleepLog::new("a", start)
            .with_end(start + Duration::hours(8))
            .with_quality(6)
            .with_tags(["sport"])];
        let summary = MonthSummary::build(&logs, 2024, 2, &Utc).unwrap();
        let text = month(&summary);

        assert!(text.starts_with("2024-02 (1 logs)"));
        assert!(text.contains("  10    8h 0m   6.0"));
        assert!(!text.contains("\n  11 "));
        assert!(text.contains("sport"));
        assert!(text.contains("(1 log)  [1 this month]"));
    }
}
