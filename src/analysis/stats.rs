//! Ecosystem summary statistics.

use std::collections::BTreeMap;

use crate::model::{EcosystemStats, Organization};

/// Counts occurrences of each key. One organization may contribute several
/// keys (one increment per list element).
pub fn count_by<'a, K, I, F>(organizations: &'a [Organization], keys: F) -> BTreeMap<K, usize>
where
    K: Ord,
    I: IntoIterator<Item = K>,
    F: Fn(&'a Organization) -> I,
{
    let mut counts = BTreeMap::new();
    for org in organizations {
        for key in keys(org) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// Mean portfolio size over organizations that report one, rounded half up.
/// Returns 0 when no organization reports a portfolio size.
pub fn average_portfolio_size(organizations: &[Organization]) -> u64 {
    let sizes: Vec<u64> = organizations.iter().filter_map(|o| o.portfolio_size).collect();
    if sizes.is_empty() {
        return 0;
    }
    // Widened so the sum cannot overflow; the mean always fits back in u64.
    let count = sizes.len() as u128;
    let total: u128 = sizes.iter().map(|&n| u128::from(n)).sum();
    ((total + count / 2) / count) as u64
}

/// Sum that stops at `u64::MAX` instead of overflowing.
fn saturating_total<I: IntoIterator<Item = u64>>(values: I) -> u64 {
    values.into_iter().fold(0u64, |acc, n| acc.saturating_add(n))
}

/// Computes the full aggregate for a collection of organizations.
pub fn calculate_ecosystem_stats(organizations: &[Organization]) -> EcosystemStats {
    EcosystemStats {
        total_players: organizations.len(),
        total_startups_supported: saturating_total(organizations.iter().map(|o| o.startups_supported)),
        total_capital_deployed: organizations
            .iter()
            .map(|o| o.capital_deployed.unwrap_or(0.0))
            .sum(),
        average_portfolio_size: average_portfolio_size(organizations),
        by_type: count_by(organizations, |o| [o.kind]),
        by_stage: count_by(organizations, |o| o.target_stages.iter().copied()),
        by_geography: count_by(organizations, |o| o.geographic_focus.iter().cloned()),
        by_sector: count_by(organizations, |o| o.target_sectors.iter().cloned()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
