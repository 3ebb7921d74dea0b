//! Heuristic ecosystem-type classification.
//!
//! The backend has no type column, so the type is inferred from two free-text
//! fields. Rules are evaluated in order and the first match wins; anything
//! that matches no rule falls back to `DEFAULT_TYPE`.

use crate::model::EcosystemType;

/// A single classification rule: matches when the text contains any of
/// `any_of` and none of `none_of`.
pub struct Rule {
    pub any_of: &'static [&'static str],
    pub none_of: &'static [&'static str],
    pub kind: EcosystemType,
}

impl Rule {
    fn matches(&self, text: &str) -> bool {
        self.any_of.iter().any(|needle| text.contains(needle))
            && !self.none_of.iter().any(|needle| text.contains(needle))
    }
}

/// Priority-ordered rules. Order is significant: "Investor Fund" must hit the
/// investor rule before the funding rule.
pub static CLASSIFICATION_RULES: &[Rule] = &[
    Rule {
        any_of: &["invest", "vc", "venture capital"],
        none_of: &[],
        kind: EcosystemType::Investor,
    },
    Rule {
        any_of: &["fund"],
        none_of: &["founder"],
        kind: EcosystemType::Funding,
    },
    Rule {
        any_of: &["government", "govt", "public sector"],
        none_of: &[],
        kind: EcosystemType::Government,
    },
    Rule {
        any_of: &["cowork", "co-work", "workspace"],
        none_of: &[],
        kind: EcosystemType::Coworking,
    },
    Rule {
        any_of: &["incubat"],
        none_of: &[],
        kind: EcosystemType::Incubator,
    },
    Rule {
        any_of: &["accelerat"],
        none_of: &[],
        kind: EcosystemType::Accelerator,
    },
    // Service-based fallback: physical space offerings read as co-working.
    Rule {
        any_of: &["office", "space"],
        none_of: &[],
        kind: EcosystemType::Coworking,
    },
];

pub const DEFAULT_TYPE: EcosystemType = EcosystemType::Accelerator;

/// Classifies a company from its "nature of company" and "industry segment"
/// fields. Total: always returns one of the six types.
pub fn derive_type(nature: Option<&str>, industry: Option<&str>) -> EcosystemType {
    let normalized = format!("{} {}", nature.unwrap_or(""), industry.unwrap_or("")).to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map(|rule| rule.kind)
        .unwrap_or(DEFAULT_TYPE)
}
