//! Free-text field parsers used by the row mapper.
//!
//! Every parser is total: malformed input degrades to a default (`0`, an
//! empty list, or `None` for scaled amounts) instead of returning an error.

use crate::model::Stage;

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

/// Splits a comma-separated field into trimmed, non-empty segments.
pub fn split_csv(value: Option<&str>) -> Vec<String> {
    match value {
        Some(text) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    }
}

/// Keeps only exact stage tokens, preserving input order and duplicates.
pub fn filter_stages<S: AsRef<str>>(tokens: &[S]) -> Vec<Stage> {
    tokens.iter().filter_map(|t| Stage::parse(t.as_ref())).collect()
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

/// Parses the leading integer of a year field ("2015", " 2015 (est.)").
/// Returns 0 when there is no leading integer or it does not fit.
pub fn parse_year(value: Option<&str>) -> i32 {
    let Some(text) = value else {
        return 0;
    };
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return 0;
    }
    match rest[..digits_len].parse::<i32>() {
        Ok(year) if negative => -year,
        Ok(year) => year,
        Err(_) => 0,
    }
}

/// Strips everything except digits, `.` and `-`, then parses the longest
/// decimal prefix. Returns 0 for absent or unparseable input.
pub fn parse_number(value: Option<&str>) -> f64 {
    let Some(text) = value else {
        return 0.0;
    };
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    parse_float_prefix(&cleaned).unwrap_or(0.0)
}

/// Parses a money figure with an optional k/m/b unit ("₹2.5M", "500k").
///
/// The unit is chosen by the first of `k`, `m`, `b` found anywhere in the
/// cleaned text, checked in that order. Returns `None` when the field is
/// absent, empty or carries no digits, so "unknown" stays distinct from 0.
pub fn parse_financial_amount(value: Option<&str>) -> Option<f64> {
    let text = value.filter(|t| !t.is_empty())?;
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | 'k' | 'm' | 'b'))
        .collect();

    let multiplier = if cleaned.contains('k') {
        1_000.0
    } else if cleaned.contains('m') {
        1_000_000.0
    } else if cleaned.contains('b') {
        1_000_000_000.0
    } else {
        1.0
    };

    let numeric: String = cleaned.chars().filter(|c| !matches!(c, 'k' | 'm' | 'b')).collect();
    parse_float_prefix(&numeric).map(|n| n * multiplier)
}

/// Longest prefix of the form `[+-]digits[.digits]` with at least one digit.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = match bytes.first() {
        Some(b'-') | Some(b'+') => 1,
        _ => 0,
    };

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let int_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            end = frac_end;
        }
    }

    if int_digits == 0 && end == int_start {
        return None;
    }
    text[..end].parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- Lists -------------------------------------------------------------

    #[test]
    fn test_split_csv_trims_and_drops_empty_segments() {
        assert_eq!(
            split_csv(Some(" Fintech, ,Healthtech ,, Agritech")),
            vec!["Fintech", "Healthtech", "Agritech"]
        );
    }

    #[test]
    fn test_split_csv_absent_or_blank_is_empty() {
        assert!(split_csv(None).is_empty());
        assert!(split_csv(Some("")).is_empty());
        assert!(split_csv(Some(" , ,")).is_empty());
    }

    #[test]
    fn test_filter_stages_drops_unknown_and_keeps_order() {
        let tokens = split_csv(Some("idea, seed, early, unknown"));
        assert_eq!(filter_stages(&tokens), vec![Stage::Idea, Stage::Early]);
    }

    #[test]
    fn test_filter_stages_keeps_duplicates() {
        let tokens = ["scale", "idea", "scale"];
        assert_eq!(filter_stages(&tokens), vec![Stage::Scale, Stage::Idea, Stage::Scale]);
    }

    // --- Years -------------------------------------------------------------

    #[test]
    fn test_parse_year_reads_leading_integer() {
        assert_eq!(parse_year(Some("2015")), 2015);
        assert_eq!(parse_year(Some("  2009 (registered)")), 2009);
        assert_eq!(parse_year(Some("1998.5")), 1998);
    }

    #[test]
    fn test_parse_year_unknown_is_zero() {
        assert_eq!(parse_year(None), 0);
        assert_eq!(parse_year(Some("")), 0);
        assert_eq!(parse_year(Some("circa 2010")), 0);
        assert_eq!(parse_year(Some("99999999999999")), 0);
    }

    // --- Generic numbers ---------------------------------------------------

    #[test]
    fn test_parse_number_strips_non_numeric_characters() {
        assert_eq!(parse_number(Some("1,200 startups")), 1200.0);
        assert_eq!(parse_number(Some("~45.5%")), 45.5);
        assert_eq!(parse_number(Some("50-100")), 50.0);
    }

    #[test]
    fn test_parse_number_keeps_sign() {
        assert_eq!(parse_number(Some("-12")), -12.0);
    }

    #[test]
    fn test_parse_number_unparseable_is_zero() {
        assert_eq!(parse_number(None), 0.0);
        assert_eq!(parse_number(Some("n/a")), 0.0);
        assert_eq!(parse_number(Some("-")), 0.0);
        assert_eq!(parse_number(Some("..")), 0.0);
    }

    // --- Scaled amounts ----------------------------------------------------

    #[test]
    fn test_financial_amount_with_million_suffix() {
        assert_eq!(parse_financial_amount(Some("₹2.5M")), Some(2_500_000.0));
    }

    #[test]
    fn test_financial_amount_units() {
        assert_eq!(parse_financial_amount(Some("500k")), Some(500_000.0));
        assert_eq!(parse_financial_amount(Some("$1.2B")), Some(1_200_000_000.0));
        assert_eq!(parse_financial_amount(Some("75000")), Some(75_000.0));
    }

    #[test]
    fn test_financial_amount_first_unit_check_wins() {
        // 'k' is checked before 'm', wherever it appears in the text.
        assert_eq!(parse_financial_amount(Some("3 million (approx. k)")), Some(3_000.0));
    }

    #[test]
    fn test_financial_amount_without_digits_is_unknown() {
        assert_eq!(parse_financial_amount(Some("raised")), None);
        assert_eq!(parse_financial_amount(Some("")), None);
        assert_eq!(parse_financial_amount(None), None);
    }

    #[test]
    fn test_financial_amount_explicit_zero_is_defined() {
        assert_eq!(parse_financial_amount(Some("0")), Some(0.0));
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float_prefix("12.5.3"), Some(12.5));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("7."), Some(7.0));
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix(""), None);
    }
}
