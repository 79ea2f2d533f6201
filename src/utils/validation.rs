//! Shared parsing and sanitization helpers

use std::str::FromStr;
use std::sync::LazyLock;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regex::Regex;

/// Date formats observed on bank statements, tried in order. The first
/// format that parses wins.
const DATE_FORMATS: [&str; 6] = [
    "%d%b%Y",   // 09Sep2024
    "%d/%m/%Y", // 09/09/2024
    "%m/%d/%Y", // 09/21/2024
    "%Y-%m-%d", // 2024-09-09
    "%d %b %Y", // 09 Sep 2024
    "%d %B %Y", // 09 September 2024
];

static PATH_UNSAFE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.\-/]").expect("hardcoded regex should be valid"));

/// Parse a statement date in any of the supported formats, normalizing to
/// an ISO calendar date. Returns `None` for strings that match no format.
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Parse a monetary amount, tolerating thousands-separator commas.
/// Returns `None` for strings that are not numbers.
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let normalized = raw.trim().replace(',', "");
    BigDecimal::from_str(&normalized).ok()
}

/// Sanitize a storage object path: every character outside
/// `[a-zA-Z0-9_.-/]` becomes a dash, and leading whitespace is dropped
/// before replacement so paths never start with a dash-encoded space.
pub fn sanitize_storage_path(path: &str) -> String {
    PATH_UNSAFE.replace_all(path.trim_start(), "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_supported_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 9).unwrap();
        assert_eq!(parse_statement_date("09Sep2024"), Some(expected));
        assert_eq!(parse_statement_date("09/09/2024"), Some(expected));
        assert_eq!(parse_statement_date("2024-09-09"), Some(expected));
        assert_eq!(parse_statement_date("09 Sep 2024"), Some(expected));
        assert_eq!(parse_statement_date("09 September 2024"), Some(expected));
        assert_eq!(parse_statement_date(" 09Sep2024 "), Some(expected));
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_statement_date("Opening balance"), None);
        assert_eq!(parse_statement_date(""), None);
        assert_eq!(parse_statement_date("32/13/2024"), None);
    }

    #[test]
    fn parses_amounts_with_commas() {
        assert_eq!(parse_amount("14,269.04"), BigDecimal::from_str("14269.04").ok());
        assert_eq!(parse_amount("-100.00"), BigDecimal::from_str("-100.00").ok());
        assert_eq!(parse_amount("not a number"), None);
    }

    #[test]
    fn sanitizes_storage_paths() {
        assert_eq!(
            sanitize_storage_path("user/12-Harbor Rowing Club/sept statement.pdf"),
            "user/12-Harbor-Rowing-Club/sept-statement.pdf"
        );
        assert_eq!(sanitize_storage_path("  a/b.csv"), "a/b.csv");
    }
}
