//! Source table registry for the ecosystem service.
//!
//! Defines the canonical list of backend tables this service reads and
//! listens to: the primary `company_primary` table plus the seven side tables
//! embedded into every row as one-to-one relations. This is the single source
//! of truth for table names: the REST select clause, the change-feed filter
//! and the verification probes all derive from here.

// ---------------------------------------------------------------------------
// Table metadata
// ---------------------------------------------------------------------------

/// Name of the primary table every query starts from.
pub const PRIMARY_TABLE: &str = "company_primary";

/// Primary key column of `company_primary`.
pub const PRIMARY_KEY: &str = "company_id";

/// How a table participates in the joined row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    /// The table the query is issued against.
    Primary,
    /// Embedded as a nested relation, expected one-to-one but delivered by
    /// the backend as either an object or an array.
    Side,
}

/// Metadata for a single backend table.
pub struct SourceTable {
    pub name: &'static str,
    pub role: TableRole,
    /// What the table holds, for reports.
    pub description: &'static str,
}

/// Columns selected from the primary table. Side tables are always selected
/// whole (`relation(*)`).
pub static PRIMARY_COLUMNS: &[&str] = &[
    "company_id",
    "company_name",
    "year_of_incorporation",
    "industry_segment",
    "nature_of_company",
    "website_url",
    "linkedin_profile_url",
    "ceo_name",
    "ceo_linkedin_url",
    "employee_size",
    "services_offerings",
    "core_value_proposition",
    "focus_sectors_industries",
    "countries_operating_in",
    "geographic_coverage_india",
];

/// All tables feeding an `Organization`, primary first.
pub static TABLE_REGISTRY: &[SourceTable] = &[
    SourceTable {
        name: PRIMARY_TABLE,
        role: TableRole::Primary,
        description: "Company identity, classification text and focus areas.",
    },
    SourceTable {
        name: "company_secondary",
        role: TableRole::Side,
        description: "Operational metrics: processing time, portfolio exits \
                      and graduations.",
    },
    SourceTable {
        name: "competitive_intelligence",
        role: TableRole::Side,
        description: "Key challenges and needs; source of target stages.",
    },
    SourceTable {
        name: "contact_information",
        role: TableRole::Side,
        description: "Addresses, phone numbers and contact persons.",
    },
    SourceTable {
        name: "digital_presence_brand",
        role: TableRole::Side,
        description: "Social and brand presence.",
    },
    SourceTable {
        name: "financials_funding",
        role: TableRole::Side,
        description: "Capital raised, revenues and valuation; source of \
                      capital deployed.",
    },
    SourceTable {
        name: "partnerships_ecosystem",
        role: TableRole::Side,
        description: "Partners and ecosystem affiliations.",
    },
    SourceTable {
        name: "indygx_specific_assessment",
        role: TableRole::Side,
        description: "Internal assessment scores.",
    },
];

/// Returns every table name in registry order.
pub fn all_table_names() -> Vec<&'static str> {
    TABLE_REGISTRY.iter().map(|t| t.name).collect()
}

/// Returns the names of the embedded side tables.
pub fn side_table_names() -> Vec<&'static str> {
    TABLE_REGISTRY
        .iter()
        .filter(|t| t.role == TableRole::Side)
        .map(|t| t.name)
        .collect()
}

/// Looks up a table by name. Returns `None` if not found.
pub fn find_table(name: &str) -> Option<&'static SourceTable> {
    TABLE_REGISTRY.iter().find(|t| t.name == name)
}

/// Builds the REST `select` clause: the explicit primary columns followed by
/// `relation(*)` for each side table.
pub fn build_select_clause() -> String {
    PRIMARY_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(side_table_names().into_iter().map(|t| format!("{}(*)", t)))
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_one_primary_and_seven_side_tables() {
        assert_eq!(TABLE_REGISTRY.len(), 8);
        let primaries: Vec<_> = TABLE_REGISTRY
            .iter()
            .filter(|t| t.role == TableRole::Primary)
            .collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].name, PRIMARY_TABLE);
        assert_eq!(side_table_names().len(), 7);
    }

    #[test]
    fn test_no_duplicate_table_names() {
        let mut seen = std::collections::HashSet::new();
        for table in TABLE_REGISTRY {
            assert!(
                seen.insert(table.name),
                "duplicate table '{}' found in TABLE_REGISTRY",
                table.name
            );
        }
    }

    #[test]
    fn test_table_names_are_valid_postgres_identifiers() {
        // Names are interpolated into URLs and LISTEN filters unquoted.
        for table in TABLE_REGISTRY {
            assert!(
                table.name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "table name '{}' should be lower snake case",
                table.name
            );
        }
    }

    #[test]
    fn test_select_clause_embeds_every_side_table() {
        let clause = build_select_clause();
        assert!(clause.starts_with("company_id,company_name,"));
        for side in side_table_names() {
            assert!(
                clause.contains(&format!("{}(*)", side)),
                "select clause missing relation '{}'",
                side
            );
        }
        assert!(!clause.contains(' '), "select clause must not contain spaces");
    }

    #[test]
    fn test_primary_key_is_first_selected_column() {
        assert_eq!(PRIMARY_COLUMNS[0], PRIMARY_KEY);
    }

    #[test]
    fn test_find_table() {
        let table = find_table("financials_funding").expect("financials should be registered");
        assert_eq!(table.role, TableRole::Side);
        assert!(find_table("company_tertiary").is_none());
    }

    #[test]
    fn test_all_table_names_helper_matches_registry_length() {
        assert_eq!(all_table_names().len(), TABLE_REGISTRY.len());
        assert_eq!(all_table_names()[0], PRIMARY_TABLE);
    }
}
