//! Read-side facade over the current organization snapshot.
//!
//! Holds one immutable `Snapshot` at a time and swaps it wholesale on every
//! successful refresh. A failed refresh leaves the previous snapshot in place.
//! Filtering, the comparison selection and chart series are all computed
//! from that snapshot.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::analysis::charts::{self, ChartPoint, TOP_SECTORS};
use crate::analysis::stats::calculate_ecosystem_stats;
use crate::ingest::{self, RowSource};
use crate::logging::{self, Source};
use crate::model::{BackendError, EcosystemStats, EcosystemType, Organization};

/// Most organizations that can be compared side by side.
pub const MAX_COMPARE: usize = 4;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub organizations: Vec<Organization>,
    pub stats: EcosystemStats,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Maps are already done; this only aggregates.
    pub fn new(organizations: Vec<Organization>, fetched_at: DateTime<Utc>) -> Self {
        let stats = calculate_ecosystem_stats(&organizations);
        Self {
            organizations,
            stats,
            fetched_at,
        }
    }
}

/// All chart series shown on the overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub by_type: Vec<ChartPoint>,
    pub by_stage: Vec<ChartPoint>,
    pub top_sectors: Vec<ChartPoint>,
    pub growth_trend: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            by_type: charts::type_distribution(&snapshot.stats),
            by_stage: charts::stage_distribution(&snapshot.stats),
            top_sectors: charts::top_sectors(&snapshot.stats, TOP_SECTORS),
            growth_trend: charts::growth_trend(&snapshot.organizations),
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Type and free-text filter for the organization list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationFilter {
    /// `None` shows every type.
    pub kind: Option<EcosystemType>,
    /// Case-insensitive substring of name, tagline or any tag.
    pub query: String,
}

impl OrganizationFilter {
    pub fn matches(&self, org: &Organization) -> bool {
        if self.kind.is_some_and(|kind| org.kind != kind) {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        let needle = self.query.to_lowercase();
        org.name.to_lowercase().contains(&needle)
            || org.tagline.to_lowercase().contains(&needle)
            || org.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Selection already holds `MAX_COMPARE` ids; nothing changed.
    Full,
}

/// Ids picked for side-by-side comparison, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompareSelection {
    ids: Vec<String>,
}

impl CompareSelection {
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn toggle(&mut self, id: &str) -> ToggleOutcome {
        if let Some(pos) = self.ids.iter().position(|i| i == id) {
            self.ids.remove(pos);
            ToggleOutcome::Removed
        } else if self.ids.len() >= MAX_COMPARE {
            ToggleOutcome::Full
        } else {
            self.ids.push(id.to_string());
            ToggleOutcome::Added
        }
    }

    /// Drops ids that no longer exist in `organizations`.
    pub fn prune(&mut self, organizations: &[Organization]) {
        self.ids.retain(|id| organizations.iter().any(|o| &o.id == id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// One metric row of the comparison table, one value per organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub label: &'static str,
    pub values: Vec<String>,
}

pub fn comparison_rows(organizations: &[&Organization]) -> Vec<ComparisonRow> {
    vec![
        metric_row("Startups Supported", organizations, |o| {
            charts::format_count(o.startups_supported)
        }),
        metric_row("Capital Deployed", organizations, |o| {
            charts::format_optional_currency(o.capital_deployed)
        }),
        metric_row("Portfolio Size", organizations, |o| {
            o.portfolio_size.map_or_else(|| "-".to_string(), |n| n.to_string())
        }),
        metric_row("Years Active", organizations, |o| format!("{} years", o.years_active)),
    ]
}

fn metric_row<F>(label: &'static str, organizations: &[&Organization], format: F) -> ComparisonRow
where
    F: Fn(&Organization) -> String,
{
    ComparisonRow {
        label,
        values: organizations.iter().map(|o| format(o)).collect(),
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct EcosystemDashboard {
    source: Box<dyn RowSource>,
    snapshot: Option<Snapshot>,
    compare: CompareSelection,
}

impl EcosystemDashboard {
    pub fn new(source: Box<dyn RowSource>) -> Self {
        Self {
            source,
            snapshot: None,
            compare: CompareSelection::default(),
        }
    }

    pub fn refresh(&mut self) -> Result<&Snapshot, BackendError> {
        self.refresh_at(Utc::now())
    }

    /// Refetches and remaps everything as of `now`. On failure the previous
    /// snapshot stays current and the error is returned.
    pub fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<&Snapshot, BackendError> {
        let organizations = match ingest::load_organizations(self.source.as_ref(), now.year()) {
            Ok(orgs) => orgs,
            Err(e) => {
                let kept = self.snapshot.as_ref().map_or(0, |s| s.organizations.len());
                logging::warn(
                    Source::System,
                    None,
                    &format!("refresh failed, keeping previous snapshot ({} organizations): {}", kept, e),
                );
                return Err(e);
            }
        };

        let snapshot = Snapshot::new(organizations, now);
        self.compare.prune(&snapshot.organizations);
        Ok(self.snapshot.insert(snapshot))
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Current organizations; empty before the first successful refresh.
    pub fn organizations(&self) -> &[Organization] {
        self.snapshot
            .as_ref()
            .map(|s| s.organizations.as_slice())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> Option<&EcosystemStats> {
        self.snapshot.as_ref().map(|s| &s.stats)
    }

    pub fn find(&self, id: &str) -> Option<&Organization> {
        self.organizations().iter().find(|o| o.id == id)
    }

    /// Fresh single-row fetch, independent of the snapshot.
    pub fn fetch_detail(&self, id: &str) -> Result<Option<Organization>, BackendError> {
        ingest::load_organization(self.source.as_ref(), id, Utc::now().year())
    }

    pub fn filter(&self, filter: &OrganizationFilter) -> Vec<&Organization> {
        self.organizations().iter().filter(|o| filter.matches(o)).collect()
    }

    pub fn charts(&self) -> Option<ChartSeries> {
        self.snapshot.as_ref().map(ChartSeries::from_snapshot)
    }

    pub fn toggle_compare(&mut self, id: &str) -> ToggleOutcome {
        self.compare.toggle(id)
    }

    pub fn compare_selection(&self) -> &CompareSelection {
        &self.compare
    }

    /// Selected organizations in snapshot order.
    pub fn compared(&self) -> Vec<&Organization> {
        self.organizations()
            .iter()
            .filter(|o| self.compare.contains(&o.id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
