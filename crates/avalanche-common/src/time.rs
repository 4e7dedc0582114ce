//! Date range handling for event queries.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Start of the range when the caller gives no `start`.
pub const DEFAULT_START: (i32, u32, u32) = (2000, 1, 1);

/// End of the range when the caller gives neither `start` nor `end`.
pub const DEFAULT_END: (i32, u32, u32) = (2100, 1, 1);

/// A half-open `[start, end)` range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Resolve the optional `start`/`end` request parameters.
    ///
    /// - neither: `[2000-01-01, 2100-01-01)`
    /// - start only: `[start, start + 1 day)`
    /// - end only: `[2000-01-01, end)`
    /// - both: `[start, end)`
    ///
    /// Empty strings count as absent.
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Result<Self, TimeParseError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        let range = match (start, end) {
            (None, None) => Self::new(default_start(), default_end()),
            (Some(s), None) => {
                let start = parse_date(s)?;
                let end = start
                    .checked_add_signed(Duration::days(1))
                    .ok_or_else(|| TimeParseError::OutOfRange(s.to_string()))?;
                Self::new(start, end)
            }
            (None, Some(e)) => Self::new(default_start(), parse_date(e)?),
            (Some(s), Some(e)) => Self::new(parse_date(s)?, parse_date(e)?),
        };

        Ok(range)
    }

    /// Number of days covered by the range (zero when inverted).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new(default_start(), default_end())
    }
}

/// Parse an ISO 8601 date, or an RFC 3339 datetime truncated to its UTC date.
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeParseError> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

fn default_start() -> NaiveDate {
    let (y, m, d) = DEFAULT_START;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

fn default_end() -> NaiveDate {
    let (y, m, d) = DEFAULT_END;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MAX)
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid date format: {0}")]
    InvalidFormat(String),

    #[error("Date out of range: {0}")]
    OutOfRange(String),
}
