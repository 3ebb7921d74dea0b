//! Chart series and display formatting derived from the aggregate.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{EcosystemStats, EcosystemType, Organization};

/// Number of founding years shown in the growth trend.
pub const TREND_YEARS: usize = 6;

/// Number of sectors shown in the top-sectors chart.
pub const TOP_SECTORS: usize = 8;

/// One labelled bar or slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: usize,
}

impl ChartPoint {
    fn new(name: impl Into<String>, value: usize) -> Self {
        Self { name: name.into(), value }
    }
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

/// Count per ecosystem type, covering all six types (absent types are 0).
pub fn type_distribution(stats: &EcosystemStats) -> Vec<ChartPoint> {
    EcosystemType::ALL
        .iter()
        .map(|t| ChartPoint::new(t.label(), stats.by_type.get(t).copied().unwrap_or(0)))
        .collect()
}

/// Count per stage, in stage order, for stages that occur.
pub fn stage_distribution(stats: &EcosystemStats) -> Vec<ChartPoint> {
    stats
        .by_stage
        .iter()
        .map(|(stage, count)| ChartPoint::new(stage.short_label(), *count))
        .collect()
}

/// The `limit` most common sectors, by count descending then name ascending.
pub fn top_sectors(stats: &EcosystemStats, limit: usize) -> Vec<ChartPoint> {
    let mut sectors: Vec<_> = stats.by_sector.iter().collect();
    sectors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    sectors
        .into_iter()
        .take(limit)
        .map(|(sector, count)| ChartPoint::new(sector.as_str(), *count))
        .collect()
}

/// Organizations founded per year for the most recent `TREND_YEARS` founding
/// years present, ascending. Unknown founding years (0) are skipped.
pub fn growth_trend(organizations: &[Organization]) -> Vec<ChartPoint> {
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    for org in organizations.iter().filter(|o| o.year_founded != 0) {
        *by_year.entry(org.year_founded).or_insert(0) += 1;
    }
    let skip = by_year.len().saturating_sub(TREND_YEARS);
    by_year
        .into_iter()
        .skip(skip)
        .map(|(year, count)| ChartPoint::new(year.to_string(), count))
        .collect()
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Compact dollar label: `$1.2B`, `$25M`, `$500K`, `$750`.
pub fn format_currency(amount: f64) -> String {
    if amount >= 1_000_000_000.0 {
        format!("${:.1}B", round_to(amount / 1_000_000_000.0, 1))
    } else if amount >= 1_000_000.0 {
        format!("${}M", (amount / 1_000_000.0).round())
    } else if amount >= 1_000.0 {
        format!("${}K", (amount / 1_000.0).round())
    } else {
        format!("${}", amount)
    }
}

/// Like `format_currency`, but unknown or zero amounts render as `-`.
pub fn format_optional_currency(amount: Option<f64>) -> String {
    match amount {
        Some(value) if value != 0.0 => format_currency(value),
        _ => "-".to_string(),
    }
}

/// Thousands-separated integer: `12,345`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// Half-up rounding; `{:.N}` alone rounds half to even.
fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
