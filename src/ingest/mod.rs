//! Row ingestion: raw backend rows and the sources that produce them.
//!
//! Submodules:
//! - `postgrest` — REST client for the hosted backend.
//!
//! Offline rows come from `dev_mode::DevMode`, which implements the same
//! `RowSource` trait.

pub mod postgrest;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::logging::{self, Source};
use crate::model::{BackendError, Organization};
use crate::normalize;

// ============================================================================
// Raw row
// ============================================================================

/// One row of `company_primary` with its seven side tables embedded.
///
/// Text columns are decoded leniently: strings are kept, numbers and booleans
/// are rendered as text, and null or structured values count as absent. Side
/// tables are kept as raw JSON because the backend delivers them either as an
/// object or as an array; `normalize::first_record` resolves them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompanyRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub company_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub year_of_incorporation: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub industry_segment: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nature_of_company: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub website_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub linkedin_profile_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ceo_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub ceo_linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee_size: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub services_offerings: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub core_value_proposition: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub focus_sectors_industries: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub countries_operating_in: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub geographic_coverage_india: Option<String>,

    // Side tables
    #[serde(default)]
    pub company_secondary: Option<Value>,
    #[serde(default)]
    pub competitive_intelligence: Option<Value>,
    #[serde(default)]
    pub contact_information: Option<Value>,
    #[serde(default)]
    pub digital_presence_brand: Option<Value>,
    #[serde(default)]
    pub financials_funding: Option<Value>,
    #[serde(default)]
    pub partnerships_ecosystem: Option<Value>,
    #[serde(default)]
    pub indygx_specific_assessment: Option<Value>,
}

impl CompanyRow {
    /// Side-table relations paired with their table names, in registry order.
    pub fn relations(&self) -> [(&'static str, Option<&Value>); 7] {
        [
            ("company_secondary", self.company_secondary.as_ref()),
            ("competitive_intelligence", self.competitive_intelligence.as_ref()),
            ("contact_information", self.contact_information.as_ref()),
            ("digital_presence_brand", self.digital_presence_brand.as_ref()),
            ("financials_funding", self.financials_funding.as_ref()),
            ("partnerships_ecosystem", self.partnerships_ecosystem.as_ref()),
            ("indygx_specific_assessment", self.indygx_specific_assessment.as_ref()),
        ]
    }
}

/// Renders a scalar JSON value as text; null, arrays and objects are absent.
/// Whole-number floats render without a fraction (`1.0` → `"1"`).
pub fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_text))
}

// ============================================================================
// Row sources
// ============================================================================

/// Anything that can hand out joined company rows: the live REST backend or
/// an offline fixture.
pub trait RowSource {
    /// Every row of the primary table with its relations embedded.
    fn fetch_rows(&self) -> Result<Vec<CompanyRow>, BackendError>;

    /// The row whose primary key equals `company_id`, if any.
    fn fetch_row(&self, company_id: &str) -> Result<Option<CompanyRow>, BackendError>;
}

/// Fetches every row from `source` and maps it into an `Organization`.
///
/// Backend failures propagate unmodified. Relations that carried several
/// differing records are logged, since only the first record is used.
pub fn load_organizations(
    source: &dyn RowSource,
    current_year: i32,
) -> Result<Vec<Organization>, BackendError> {
    let rows = source.fetch_rows()?;

    let mut conflicted = 0;
    let organizations: Vec<Organization> = rows
        .iter()
        .map(|row| {
            log_missing_id(row);
            if log_relation_conflicts(row) {
                conflicted += 1;
            }
            normalize::map_row_at(row, current_year)
        })
        .collect();

    logging::log_refresh_summary(rows.len(), organizations.len(), conflicted);
    Ok(organizations)
}

/// Fetches and maps a single row by primary key.
pub fn load_organization(
    source: &dyn RowSource,
    company_id: &str,
    current_year: i32,
) -> Result<Option<Organization>, BackendError> {
    let row = source.fetch_row(company_id)?;
    Ok(row.map(|row| {
        log_missing_id(&row);
        log_relation_conflicts(&row);
        normalize::map_row_at(&row, current_year)
    }))
}

/// Rows without a primary key map to an empty id, which lookups and the
/// comparison selection cannot address.
fn log_missing_id(row: &CompanyRow) -> bool {
    let missing = row.company_id.as_deref().is_none_or(str::is_empty);
    if missing {
        let name = row.company_name.as_deref().unwrap_or("?");
        logging::warn(
            Source::Mapper,
            None,
            &format!("row '{}' has no company_id; it maps to an empty id", name),
        );
    }
    missing
}

fn log_relation_conflicts(row: &CompanyRow) -> bool {
    let conflicts = normalize::relation_conflicts(row);
    let id = row.company_id.as_deref().unwrap_or("?");
    for table in &conflicts {
        logging::warn(
            Source::Mapper,
            Some(table),
            &format!(
                "company {} has several differing {} records; only the first is used",
                id, table
            ),
        );
    }
    !conflicts.is_empty()
}

// ============================================================================
// Tests
// ============================================================================
