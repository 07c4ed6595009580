//! Ranking policies over [`TagImpact`] lists.
//!
//! Every policy uses a stable sort, so tags with equal keys keep the order
//! they had in the input and repeated calls on the same input agree.

use std::cmp::Ordering;

use super::impact::TagImpact;

/// Tags seen fewer times than this are left out of delta rankings.
pub const DEFAULT_MIN_SAMPLE: u32 = 3;

/// Default length of a top-K list.
pub const DEFAULT_TOP_COUNT: usize = 5;

/// Which delta a ranking sorts and filters by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImpactKey {
    /// `delta_quality`
    #[default]
    Quality,
    /// `delta_quality + delta_duration`
    Combined,
}

impl ImpactKey {
    /// The value this key ranks on.
    pub fn score(&self, impact: &TagImpact) -> f64 {
        match self {
            ImpactKey::Quality => impact.delta_quality,
            ImpactKey::Combined => impact.combined_delta(),
        }
    }
}

/// Parameters for the top-positive / top-negative selections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingOptions {
    /// Ranking key
    pub key: ImpactKey,
    /// Maximum number of tags returned
    pub limit: usize,
    /// Minimum incidence for a tag to be ranked (0 disables the filter)
    pub min_count: u32,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            key: ImpactKey::Quality,
            limit: DEFAULT_TOP_COUNT,
            min_count: DEFAULT_MIN_SAMPLE,
        }
    }
}

impl RankingOptions {
    /// Rank by `key` with no minimum sample size.
    pub fn unfiltered(key: ImpactKey, limit: usize) -> Self {
        Self {
            key,
            limit,
            min_count: 0,
        }
    }

    /// Same options with a different minimum sample size.
    pub fn with_min_count(self, min_count: u32) -> Self {
        Self { min_count, ..self }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Tags with a positive score, best first.
pub fn top_positive<'a>(impacts: &'a [TagImpact], options: RankingOptions) -> Vec<&'a TagImpact> {
    let mut ranked: Vec<&TagImpact> = impacts
        .iter()
        .filter(|i| i.count >= options.min_count && options.key.score(i) > 0.0)
        .collect();
    ranked.sort_by(|a, b| descending(options.key.score(a), options.key.score(b)));
    ranked.truncate(options.limit);
    ranked
}

/// Tags with a negative score, most negative first.
pub fn top_negative<'a>(impacts: &'a [TagImpact], options: RankingOptions) -> Vec<&'a TagImpact> {
    let mut ranked: Vec<&TagImpact> = impacts
        .iter()
        .filter(|i| i.count >= options.min_count && options.key.score(i) < 0.0)
        .collect();
    ranked.sort_by(|a, b| descending(options.key.score(b), options.key.score(a)));
    ranked.truncate(options.limit);
    ranked
}

/// All tags, most frequent first, regardless of delta.
pub fn by_incidence(impacts: &[TagImpact]) -> Vec<&TagImpact> {
    let mut ranked: Vec<&TagImpact> = impacts.iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// The most common tags that also have a clear effect.
///
/// Takes the `limit` most frequent tags with a positive score and the `limit`
/// most frequent with a negative score, then orders the union by incidence.
pub fn mixed_incidence(impacts: &[TagImpact], key: ImpactKey, limit: usize) -> Vec<&TagImpact> {
    let ranked = by_incidence(impacts);

    let positive = ranked
        .iter()
        .copied()
        .filter(|i| key.score(i) > 0.0)
        .take(limit);
    let negative = ranked
        .iter()
        .copied()
        .filter(|i| key.score(i) < 0.0)
        .take(limit);

    let mut merged: Vec<&TagImpact> = positive.chain(negative).collect();
    merged.sort_by(|a, b| b.count.cmp(&a.count));
    merged
}

/// Tags whose name contains `query`, ignoring case. An empty query keeps all.
pub fn filter_by_query<'a>(impacts: &'a [TagImpact], query: &str) -> Vec<&'a TagImpact> {
    let needle = query.trim().to_lowercase();
    impacts
        .iter()
        .filter(|i| needle.is_empty() || i.tag.to_lowercase().contains(&needle))
        .collect()
}

/// Interpret a user-entered minimum sample size.
///
/// Non-numeric or zero input falls back to [`DEFAULT_MIN_SAMPLE`], and the
/// result never drops below it.
pub fn min_sample_threshold(input: &str) -> u32 {
    match input.trim().parse::<u32>() {
        Ok(n) if n > 0 => n.max(DEFAULT_MIN_SAMPLE),
        _ => DEFAULT_MIN_SAMPLE,
    }
}
