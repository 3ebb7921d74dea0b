//! Row mapper: flattens one joined `CompanyRow` into an `Organization`.
//!
//! Mapping never fails. Missing relations, missing columns and malformed text
//! all degrade to defaults, so every row yields exactly one record.
//!
//! Submodules:
//! - `parse`    — list, year, number and scaled-amount parsers.
//! - `classify` — ordered rule table for the ecosystem type.
//!
//! # Clock injection
//! `map_row_at` takes the current year as a parameter; `map_row` is the
//! convenience wrapper that reads the system clock.

pub mod classify;
pub mod parse;

use chrono::Datelike;
use serde_json::{Map, Value};

use crate::ingest::{value_as_text, CompanyRow};
use crate::model::Organization;
use parse::{filter_stages, parse_financial_amount, parse_number, parse_year, split_csv};

pub const UNKNOWN_NAME: &str = "Unknown Organization";
pub const UNKNOWN_HEADQUARTERS: &str = "—";
pub const PLACEHOLDER_WEBSITE: &str = "#";

type Record = Map<String, Value>;

// ---------------------------------------------------------------------------
// Nested record resolution
// ---------------------------------------------------------------------------

/// Resolves a one-to-one relation delivered as an object, an array or nothing.
///
/// Arrays always resolve to their first element; any further elements are
/// ignored (see `relation_conflicts`).
pub fn first_record(relation: Option<&Value>) -> Option<&Record> {
    match relation? {
        Value::Array(items) => items.first().and_then(Value::as_object),
        Value::Object(record) => Some(record),
        _ => None,
    }
}

/// Names of relations that arrived as arrays holding more than one distinct
/// record. Only the first record is mapped, so these are data-loss points.
pub fn relation_conflicts(row: &CompanyRow) -> Vec<&'static str> {
    row.relations()
        .into_iter()
        .filter_map(|(table, relation)| match relation {
            Some(Value::Array(items)) if items.len() > 1 => {
                let first = &items[0];
                items[1..].iter().any(|item| item != first).then_some(table)
            }
            _ => None,
        })
        .collect()
}

fn field(record: Option<&Record>, key: &str) -> Option<String> {
    record.and_then(|r| r.get(key)).and_then(value_as_text)
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Maps a row using the current calendar year (UTC) for `years_active`.
/// Use `map_row_at` in tests to keep them deterministic.
pub fn map_row(row: &CompanyRow) -> Organization {
    map_row_at(row, chrono::Utc::now().year())
}

/// Maps a row into an `Organization`, computing `years_active` against
/// `current_year`. Pure: the same inputs always yield the same record.
pub fn map_row_at(row: &CompanyRow, current_year: i32) -> Organization {
    let secondary = first_record(row.company_secondary.as_ref());
    let financials = first_record(row.financials_funding.as_ref());
    let competitive = first_record(row.competitive_intelligence.as_ref());

    let year_founded = parse_year(row.year_of_incorporation.as_deref());
    let years_active = if year_founded != 0 {
        current_year.saturating_sub(year_founded).max(0) as u32
    } else {
        0
    };

    let challenges = field(competitive, "key_challenges_and_needs");
    let target_stages = filter_stages(&split_csv(challenges.as_deref()));
    let target_sectors = split_csv(row.focus_sectors_industries.as_deref());
    let geographic_focus = split_csv(
        row.countries_operating_in
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(row.geographic_coverage_india.as_deref()),
    );

    // Metric fallback chains: the first candidate yielding a value wins.
    let startups_supported = [
        parse_number(row.employee_size.as_deref()),
        parse_number(field(secondary, "processing_time").as_deref()),
    ]
    .into_iter()
    .find(|n| *n != 0.0)
    .map(non_negative_count)
    .unwrap_or(0);

    let capital_deployed = [
        "total_capital_raised_to_date",
        "annual_revenues",
        "company_valuation",
    ]
    .into_iter()
    .find_map(|key| parse_financial_amount(field(financials, key).as_deref()));

    let portfolio_size = Some(parse_number(
        field(secondary, "success_rate_portfolio_exits_graduations").as_deref(),
    ))
    .map(non_negative_count)
    .filter(|n| *n > 0);

    let mut tags = split_csv(row.industry_segment.as_deref());
    tags.extend(split_csv(row.nature_of_company.as_deref()));

    Organization {
        id: row.company_id.clone().unwrap_or_default(),
        name: row
            .company_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        kind: classify::derive_type(
            row.nature_of_company.as_deref(),
            row.industry_segment.as_deref(),
        ),
        tagline: row
            .core_value_proposition
            .clone()
            .or_else(|| row.industry_segment.clone())
            .unwrap_or_default(),
        description: row
            .services_offerings
            .clone()
            .or_else(|| row.core_value_proposition.clone())
            .unwrap_or_default(),
        year_founded,
        headquarters: row
            .countries_operating_in
            .clone()
            .unwrap_or_else(|| UNKNOWN_HEADQUARTERS.to_string()),
        website: row
            .website_url
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_WEBSITE.to_string()),
        linkedin: row.linkedin_profile_url.clone(),
        startups_supported,
        capital_deployed,
        portfolio_size,
        years_active,
        target_stages,
        target_sectors,
        geographic_focus,
        capital_types: Some(Vec::new()),
        support_types: split_csv(row.services_offerings.as_deref()),
        tags,
        impact_focus: false,
        inclusion_focus: false,
        founder_profiles: Some(split_csv(row.ceo_name.as_deref())),
    }
}

/// Rounds to the nearest whole count; negatives clamp to 0.
fn non_negative_count(value: f64) -> u64 {
    if value <= 0.0 { 0 } else { value.round() as u64 }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EcosystemType, Stage};
    use serde_json::json;

    fn row(value: Value) -> CompanyRow {
        serde_json::from_value(value).expect("test row should decode")
    }

    fn full_row() -> CompanyRow {
        row(json!({
            "company_id": 101,
            "company_name": "Bharat Launchpad",
            "year_of_incorporation": "2015",
            "industry_segment": "Fintech, Deeptech",
            "nature_of_company": "Startup Accelerator",
            "website_url": "https://launchpad.example",
            "linkedin_profile_url": "https://linkedin.com/company/launchpad",
            "ceo_name": "A. Rao, K. Mehta",
            "employee_size": "120 startups",
            "services_offerings": "Mentorship, Demo Day, Office hours",
            "core_value_proposition": "From idea to scale",
            "focus_sectors_industries": "Fintech, Healthtech",
            "countries_operating_in": "India, Singapore",
            "geographic_coverage_india": "Pan-India",
            "company_secondary": [{
                "processing_time": "30",
                "success_rate_portfolio_exits_graduations": "40"
            }],
            "competitive_intelligence": {"key_challenges_and_needs": "idea, seed, early, growth"},
            "financials_funding": [{"total_capital_raised_to_date": "₹2.5M"}],
        }))
    }

    // --- Full row ----------------------------------------------------------

    #[test]
    fn test_full_row_maps_every_field() {
        let org = map_row_at(&full_row(), 2024);

        assert_eq!(org.id, "101");
        assert_eq!(org.name, "Bharat Launchpad");
        assert_eq!(org.kind, EcosystemType::Accelerator);
        assert_eq!(org.tagline, "From idea to scale");
        assert_eq!(org.description, "Mentorship, Demo Day, Office hours");
        assert_eq!(org.year_founded, 2015);
        assert_eq!(org.years_active, 9);
        assert_eq!(org.headquarters, "India, Singapore");
        assert_eq!(org.website, "https://launchpad.example");
        assert_eq!(org.linkedin.as_deref(), Some("https://linkedin.com/company/launchpad"));
        assert_eq!(org.startups_supported, 120);
        assert_eq!(org.capital_deployed, Some(2_500_000.0));
        assert_eq!(org.portfolio_size, Some(40));
        assert_eq!(org.target_stages, vec![Stage::Idea, Stage::Early, Stage::Growth]);
        assert_eq!(org.target_sectors, vec!["Fintech", "Healthtech"]);
        assert_eq!(org.geographic_focus, vec!["India", "Singapore"]);
        assert_eq!(org.support_types, vec!["Mentorship", "Demo Day", "Office hours"]);
        assert_eq!(org.tags, vec!["Fintech", "Deeptech", "Startup Accelerator"]);
        assert_eq!(org.capital_types, Some(vec![]));
        assert_eq!(org.founder_profiles, Some(vec!["A. Rao".to_string(), "K. Mehta".to_string()]));
        assert!(!org.impact_focus);
        assert!(!org.inclusion_focus);
    }

    // --- Defaults ----------------------------------------------------------

    #[test]
    fn test_row_without_side_tables_uses_defaults() {
        let org = map_row_at(&row(json!({"company_id": 5})), 2024);

        assert_eq!(org.id, "5");
        assert_eq!(org.name, UNKNOWN_NAME);
        assert_eq!(org.kind, EcosystemType::Accelerator);
        assert_eq!(org.headquarters, UNKNOWN_HEADQUARTERS);
        assert_eq!(org.website, PLACEHOLDER_WEBSITE);
        assert_eq!(org.tagline, "");
        assert_eq!(org.description, "");
        assert_eq!(org.startups_supported, 0);
        assert_eq!(org.capital_deployed, None);
        assert_eq!(org.portfolio_size, None);
        assert_eq!(org.year_founded, 0);
        assert_eq!(org.years_active, 0);
        assert!(org.target_stages.is_empty());
        assert!(org.tags.is_empty());
    }

    #[test]
    fn test_empty_relations_behave_like_missing_ones() {
        let org = map_row_at(
            &row(json!({
                "company_id": 5,
                "company_secondary": [],
                "financials_funding": null,
                "competitive_intelligence": "not a record",
            })),
            2024,
        );
        assert_eq!(org.startups_supported, 0);
        assert_eq!(org.capital_deployed, None);
        assert!(org.target_stages.is_empty());
    }

    #[test]
    fn test_empty_strings_are_kept_by_text_fallbacks() {
        // Only absent values fall through to the next candidate.
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "core_value_proposition": "",
                "industry_segment": "Edtech",
                "countries_operating_in": "",
            })),
            2024,
        );
        assert_eq!(org.tagline, "");
        assert_eq!(org.headquarters, "");
    }

    #[test]
    fn test_geographic_focus_falls_back_when_countries_blank() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "countries_operating_in": "",
                "geographic_coverage_india": "Karnataka, Kerala",
            })),
            2024,
        );
        assert_eq!(org.geographic_focus, vec!["Karnataka", "Kerala"]);
    }

    // --- Metric fallback chains --------------------------------------------

    #[test]
    fn test_startups_supported_falls_back_to_processing_time() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "employee_size": "unknown",
                "company_secondary": {"processing_time": "25"},
            })),
            2024,
        );
        assert_eq!(org.startups_supported, 25);
    }

    #[test]
    fn test_negative_startups_supported_clamps_to_zero() {
        let org = map_row_at(&row(json!({"company_id": 1, "employee_size": "-3"})), 2024);
        assert_eq!(org.startups_supported, 0);
    }

    #[test]
    fn test_capital_deployed_takes_first_defined_candidate() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "financials_funding": {
                    "total_capital_raised_to_date": "undisclosed",
                    "annual_revenues": "500k",
                    "company_valuation": "1B",
                }
            })),
            2024,
        );
        assert_eq!(org.capital_deployed, Some(500_000.0));
    }

    #[test]
    fn test_capital_deployed_explicit_zero_stops_the_chain() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "financials_funding": {
                    "total_capital_raised_to_date": "0",
                    "annual_revenues": "500k",
                }
            })),
            2024,
        );
        assert_eq!(org.capital_deployed, Some(0.0));
    }

    #[test]
    fn test_numeric_side_fields_are_read_as_text() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "company_secondary": {"success_rate_portfolio_exits_graduations": 12},
                "financials_funding": {"company_valuation": 3000000},
            })),
            2024,
        );
        assert_eq!(org.portfolio_size, Some(12));
        assert_eq!(org.capital_deployed, Some(3_000_000.0));
    }

    #[test]
    fn test_zero_portfolio_is_unknown() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "company_secondary": {"success_rate_portfolio_exits_graduations": "0%"},
            })),
            2024,
        );
        assert_eq!(org.portfolio_size, None);
    }

    #[test]
    fn test_portfolio_rounding_to_zero_is_unknown() {
        let org = map_row_at(
            &row(json!({
                "company_id": 1,
                "company_secondary": {"success_rate_portfolio_exits_graduations": "0.4%"},
            })),
            2024,
        );
        assert_eq!(org.portfolio_size, None);
    }

    #[test]
    fn test_saturated_startup_counts_map_and_aggregate() {
        let huge = row(json!({"company_id": 1, "employee_size": "99999999999999999999"}));
        let orgs = vec![map_row_at(&huge, 2024), map_row_at(&huge, 2024)];
        assert_eq!(orgs[0].startups_supported, u64::MAX);
        let stats = crate::analysis::stats::calculate_ecosystem_stats(&orgs);
        assert_eq!(stats.total_startups_supported, u64::MAX);
    }

    // --- Years -------------------------------------------------------------

    #[test]
    fn test_years_active_never_negative() {
        let org = map_row_at(&row(json!({"company_id": 1, "year_of_incorporation": "2030"})), 2024);
        assert_eq!(org.year_founded, 2030);
        assert_eq!(org.years_active, 0);
    }

    // --- Relations ---------------------------------------------------------

    #[test]
    fn test_first_record_resolution() {
        let single = json!({"a": 1});
        let many = json!([{"a": 1}, {"a": 2}]);
        let empty = json!([]);
        assert_eq!(first_record(Some(&single)).unwrap()["a"], 1);
        assert_eq!(first_record(Some(&many)).unwrap()["a"], 1);
        assert!(first_record(Some(&empty)).is_none());
        assert!(first_record(None).is_none());
    }

    #[test]
    fn test_relation_conflicts_only_flags_differing_records() {
        let conflicting = row(json!({
            "company_id": 1,
            "financials_funding": [{"annual_revenues": "1M"}, {"annual_revenues": "2M"}],
            "company_secondary": [{"processing_time": "3"}, {"processing_time": "3"}],
            "contact_information": {"email": "x@example.com"},
        }));
        assert_eq!(relation_conflicts(&conflicting), vec!["financials_funding"]);
        assert!(relation_conflicts(&full_row()).is_empty());
    }

    // --- Determinism -------------------------------------------------------

    #[test]
    fn test_mapping_same_row_twice_is_identical() {
        let source = full_row();
        assert_eq!(map_row_at(&source, 2024), map_row_at(&source, 2024));
    }
}
