//! Backend table verification
//!
//! Probes every registered table against the live backend to find out which
//! ones are reachable with the configured key and actually hold rows.
//!
//! Run this before pointing the service at a new project, or when the list
//! query starts failing, to see which relation is at fault.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ingest::postgrest::{RestClient, TableProbe};
use crate::logging::{self, Source};
use crate::model::BackendError;
use crate::tables::{SourceTable, TableRole, TABLE_REGISTRY};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub results: Vec<TableVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub empty: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableVerification {
    pub table: String,
    pub primary: bool,
    pub status: VerificationStatus,
    pub sample_rows: usize,
    pub total_rows: Option<u64>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    /// Reachable and holds rows
    Success,
    /// Reachable but empty
    PartialSuccess,
    Failed,
}

// ============================================================================
// Probing
// ============================================================================

/// Turn the outcome of one probe into a verification entry.
pub fn evaluate_probe(table: &SourceTable, probe: Result<TableProbe, BackendError>) -> TableVerification {
    let mut result = TableVerification {
        table: table.name.to_string(),
        primary: table.role == TableRole::Primary,
        status: VerificationStatus::Failed,
        sample_rows: 0,
        total_rows: None,
        error_message: None,
    };

    match probe {
        Ok(probe) => {
            result.sample_rows = probe.sample_rows;
            result.total_rows = probe.total_rows;
            let has_rows = probe.sample_rows > 0 || probe.total_rows.is_some_and(|n| n > 0);
            if has_rows {
                result.status = VerificationStatus::Success;
            } else {
                result.status = VerificationStatus::PartialSuccess;
                result.error_message = Some("table is reachable but empty".to_string());
            }
        }
        Err(e) => {
            result.error_message = Some(e.to_string());
        }
    }

    result
}

pub fn verify_table(client: &RestClient, table: &SourceTable) -> TableVerification {
    evaluate_probe(table, client.probe_table(table.name))
}

/// Build a report out of per-table results.
pub fn summarize(results: Vec<TableVerification>) -> VerificationReport {
    let mut summary = VerificationSummary {
        total: results.len(),
        ..VerificationSummary::default()
    };
    for result in &results {
        match result.status {
            VerificationStatus::Success => summary.working += 1,
            VerificationStatus::PartialSuccess => summary.empty += 1,
            VerificationStatus::Failed => summary.failed += 1,
        }
    }

    VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        results,
        summary,
    }
}

/// Probe every table in the registry.
pub fn verify_tables(client: &RestClient) -> VerificationReport {
    let results: Vec<TableVerification> = TABLE_REGISTRY
        .iter()
        .map(|table| {
            let result = verify_table(client, table);
            match result.status {
                VerificationStatus::Success => logging::info(
                    Source::Rest,
                    Some(table.name),
                    &format!("reachable, {} rows", total_label(result.total_rows)),
                ),
                VerificationStatus::PartialSuccess => {
                    logging::warn(Source::Rest, Some(table.name), "reachable but empty")
                }
                VerificationStatus::Failed => logging::error(
                    Source::Rest,
                    Some(table.name),
                    result.error_message.as_deref().unwrap_or("probe failed"),
                ),
            }
            result
        })
        .collect();

    summarize(results)
}

fn total_label(total: Option<u64>) -> String {
    total.map_or_else(|| "?".to_string(), |n| n.to_string())
}

pub fn print_summary(report: &VerificationReport) {
    println!("═══════════════════════════════════════════════════════════");
    println!("BACKEND TABLE VERIFICATION  ({})", report.timestamp);
    println!("═══════════════════════════════════════════════════════════");

    for result in &report.results {
        let marker = match result.status {
            VerificationStatus::Success => "✓",
            VerificationStatus::PartialSuccess => "⚠",
            VerificationStatus::Failed => "✗",
        };
        let role = if result.primary { " (primary)" } else { "" };
        match result.status {
            VerificationStatus::Failed => println!(
                "  {} {}{}: {}",
                marker,
                result.table,
                role,
                result.error_message.as_deref().unwrap_or("Unknown")
            ),
            _ => println!(
                "  {} {}{}: {} rows",
                marker,
                result.table,
                role,
                total_label(result.total_rows)
            ),
        }
    }

    println!();
    println!(
        "{}/{} tables with data, {} empty, {} failed",
        report.summary.working, report.summary.total, report.summary.empty, report.summary.failed
    );
    println!("═══════════════════════════════════════════════════════════");
}

// ============================================================================
// Tests
// ============================================================================
