//! Tests for request date range defaulting.

use avalanche_common::time::{parse_date, DateRange, TimeParseError};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_no_start_no_end() {
    let range = DateRange::from_params(None, None).unwrap();
    assert_eq!(range.start, date(2000, 1, 1));
    assert_eq!(range.end, date(2100, 1, 1));
}

#[test]
fn test_start_only_is_one_day() {
    let range = DateRange::from_params(Some("2023-01-05"), None).unwrap();
    assert_eq!(range.start, date(2023, 1, 5));
    assert_eq!(range.end, date(2023, 1, 6));
}

#[test]
fn test_start_only_crosses_month_and_year() {
    let range = DateRange::from_params(Some("2023-12-31"), None).unwrap();
    assert_eq!(range.end, date(2024, 1, 1));
}

#[test]
fn test_start_and_end() {
    let range = DateRange::from_params(Some("2023-01-05"), Some("2023-02-01")).unwrap();
    assert_eq!(range, DateRange::new(date(2023, 1, 5), date(2023, 2, 1)));
}

#[test]
fn test_empty_strings_are_absent() {
    let range = DateRange::from_params(Some(""), Some("  ")).unwrap();
    assert_eq!(range, DateRange::default());
}

#[test]
fn test_malformed_start() {
    let result = DateRange::from_params(Some("05.01.2023"), None);
    assert!(matches!(result, Err(TimeParseError::InvalidFormat(_))));
}

#[test]
fn test_malformed_end() {
    let result = DateRange::from_params(Some("2023-01-05"), Some("2023-13-01"));
    assert!(result.is_err());
}

#[test]
fn test_parse_date_accepts_rfc3339() {
    assert_eq!(parse_date("2024-01-15T12:00:00Z").unwrap(), date(2024, 1, 15));
}

#[test]
fn test_start_on_last_representable_day_is_rejected() {
    assert_eq!(parse_date("+262142-12-31").unwrap(), date(262142, 12, 31));

    let result = DateRange::from_params(Some("+262142-12-31"), None);
    assert!(matches!(result, Err(TimeParseError::OutOfRange(_))));
}

#[test]
fn test_start_on_last_representable_day_with_end_is_accepted() {
    let range = DateRange::from_params(Some("+262142-12-31"), Some("2023-01-01")).unwrap();
    assert_eq!(range.start, date(262142, 12, 31));
    assert_eq!(range.days(), 0);
}
