//! Calendar dates
//!
//! A date is identified by its `YYYY-MM-DD` string, it is the primary key in storage.

use chrono::NaiveDate;
use chrono::naive::NaiveDateTime;

/// Format of the date identifier
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar date users can attend and attach notes to
#[derive(Clone, Debug)]
pub struct Date {
    /// The `YYYY-MM-DD` identifier
    pub date: String,

    /// Creation date
    pub created_at: NaiveDateTime,
}

/// A user attending a date
#[derive(Clone, Debug)]
pub struct Attendee {
    /// Identifier of the attended date
    pub date: String,

    /// The attending user
    pub user_id: i64,
}

/// Does the identifier look like `20YY-MM-DD` with a year of at least 2020?
///
/// Only the shape is checked here, `2022-02-31` passes
fn matches_pattern(value: &str) -> bool {
    let bytes = value.as_bytes();

    if bytes.len() != 10 {
        return false;
    }

    bytes[0] == b'2'
        && bytes[1] == b'0'
        && (b'2'..=b'9').contains(&bytes[2])
        && bytes[3].is_ascii_digit()
        && bytes[4] == b'-'
        && (b'0'..=b'1').contains(&bytes[5])
        && bytes[6].is_ascii_digit()
        && bytes[7] == b'-'
        && (b'0'..=b'3').contains(&bytes[8])
        && bytes[9].is_ascii_digit()
}

/// Is the given identifier a valid date identifier?
///
/// Must match `20YY-MM-DD` (2020 or later) and name an existing calendar day
pub fn is_valid_identifier(value: &str) -> bool {
    matches_pattern(value) && NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

/// Prefix to find all dates of a month with
///
/// The parts are used as given, `("2022", "2")` will not match `2022-02-01`
pub fn month_prefix(year: &str, month: &str) -> String {
    format!("{year}-{month}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for value in ["2020-01-01", "2022-02-25", "2024-02-29", "2099-12-31"] {
            assert!(is_valid_identifier(value), "{value} should be valid");
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for value in [
            "",
            "2019-12-31",
            "1999-01-01",
            "2100-01-01",
            "22-02-25",
            "2022-2-25",
            "2022-02-5",
            "2022/02/25",
            "2022-13-01",
            "2022-00-10",
            "2022-02-30",
            "2023-02-29",
            "2022-02-25 ",
            "2022-02-25T00:00:00",
            "abcd-ef-gh",
        ] {
            assert!(!is_valid_identifier(value), "{value:?} should be invalid");
        }
    }

    #[test]
    fn test_month_prefix() {
        assert_eq!("2022-02", month_prefix("2022", "02"));
        assert_eq!("2022-2", month_prefix("2022", "2"));
    }
}
