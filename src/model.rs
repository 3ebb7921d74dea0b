//! Core data types for the ecosystem service.
//!
//! This module defines the shared domain model imported by all other modules:
//! the closed enumerations, the normalized `Organization` record, the
//! `EcosystemStats` aggregate and the backend error type. No I/O lives here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Ecosystem type
// ---------------------------------------------------------------------------

/// The six kinds of ecosystem player. Every `Organization` carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EcosystemType {
    Accelerator,
    Investor,
    Funding,
    Government,
    Coworking,
    Incubator,
}

impl EcosystemType {
    /// All variants in display order.
    pub const ALL: [EcosystemType; 6] = [
        EcosystemType::Accelerator,
        EcosystemType::Investor,
        EcosystemType::Funding,
        EcosystemType::Government,
        EcosystemType::Coworking,
        EcosystemType::Incubator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EcosystemType::Accelerator => "accelerator",
            EcosystemType::Investor => "investor",
            EcosystemType::Funding => "funding",
            EcosystemType::Government => "government",
            EcosystemType::Coworking => "coworking",
            EcosystemType::Incubator => "incubator",
        }
    }

    /// Plural display label used in headings and chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            EcosystemType::Accelerator => "Accelerators",
            EcosystemType::Investor => "Investors",
            EcosystemType::Funding => "Funding Platforms",
            EcosystemType::Government => "Government",
            EcosystemType::Coworking => "Co-working",
            EcosystemType::Incubator => "Incubators",
        }
    }

    /// Exact token match. Returns `None` for anything that is not one of
    /// the six lower-case tokens.
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }
}

impl fmt::Display for EcosystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Target startup maturity.
///
/// Ordered: idea < early < growth < scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idea,
    Early,
    Growth,
    Scale,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Idea, Stage::Early, Stage::Growth, Stage::Scale];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idea => "idea",
            Stage::Early => "early",
            Stage::Growth => "growth",
            Stage::Scale => "scale",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Idea => "Idea Stage",
            Stage::Early => "Early Stage",
            Stage::Growth => "Growth Stage",
            Stage::Scale => "Scale Stage",
        }
    }

    /// Short name used on chart axes.
    pub fn short_label(&self) -> &'static str {
        match self {
            Stage::Idea => "Idea",
            Stage::Early => "Early",
            Stage::Growth => "Growth",
            Stage::Scale => "Scale",
        }
    }

    /// Case-sensitive: "Seed" and "IDEA" are both unrecognized.
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == token)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Capital type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapitalType {
    Equity,
    Grant,
    Debt,
    Blended,
    Convertible,
}

impl CapitalType {
    pub const ALL: [CapitalType; 5] = [
        CapitalType::Equity,
        CapitalType::Grant,
        CapitalType::Debt,
        CapitalType::Blended,
        CapitalType::Convertible,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapitalType::Equity => "equity",
            CapitalType::Grant => "grant",
            CapitalType::Debt => "debt",
            CapitalType::Blended => "blended",
            CapitalType::Convertible => "convertible",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapitalType::Equity => "Equity",
            CapitalType::Grant => "Grants",
            CapitalType::Debt => "Debt",
            CapitalType::Blended => "Blended Finance",
            CapitalType::Convertible => "Convertible Notes",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == token)
    }
}

// ---------------------------------------------------------------------------
// Organization
// ---------------------------------------------------------------------------

/// A normalized ecosystem player, assembled from one joined backend row by
/// `normalize::map_row_at`.
///
/// `capital_deployed` and `portfolio_size` stay `None` when no source field
/// yielded a value, so "unknown" is distinguishable from an explicit zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EcosystemType,
    pub tagline: String,
    pub description: String,
    pub year_founded: i32,
    pub headquarters: String,
    pub website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,

    // Metrics
    pub startups_supported: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_deployed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_size: Option<u64>,
    pub years_active: u32,

    // Focus areas
    pub target_stages: Vec<Stage>,
    pub target_sectors: Vec<String>,
    pub geographic_focus: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_types: Option<Vec<CapitalType>>,

    pub support_types: Vec<String>,
    pub tags: Vec<String>,

    // Impact
    pub impact_focus: bool,
    pub inclusion_focus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founder_profiles: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Summary counts and sums over a collection of organizations.
///
/// Produced by `analysis::stats::calculate_ecosystem_stats`; has no identity
/// and is recomputed whenever the collection changes. Grouped maps only hold
/// keys that actually occur.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcosystemStats {
    pub total_players: usize,
    pub total_startups_supported: u64,
    pub total_capital_deployed: f64,
    pub average_portfolio_size: u64,
    pub by_type: BTreeMap<EcosystemType, usize>,
    pub by_stage: BTreeMap<Stage, usize>,
    pub by_geography: BTreeMap<String, usize>,
    pub by_sector: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when talking to the backend or loading rows.
///
/// There is no retry policy: every variant is surfaced to the caller as-is.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// Non-2xx HTTP response from the REST API.
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("Request failed: {0}")]
    Request(String),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
    /// An offline fixture file could not be read or decoded.
    #[error("Fixture error: {0}")]
    Fixture(String),
    /// The change-notification connection failed.
    #[error("Realtime error: {0}")]
    Realtime(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Parse(err.to_string())
        } else {
            BackendError::Request(err.to_string())
        }
    }
}

impl From<postgres::Error> for BackendError {
    fn from(err: postgres::Error) -> Self {
        BackendError::Realtime(err.to_string())
    }
}
