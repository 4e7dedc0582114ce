//! Region filter parsing.

use serde::{Deserialize, Serialize};

/// Optional restriction of a query to a set of forecast region identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionFilter {
    ids: Vec<i32>,
}

impl RegionFilter {
    pub fn new(ids: Vec<i32>) -> Self {
        Self { ids }
    }

    /// Parse a comma separated list such as `"3003,3010"`.
    ///
    /// Blank entries are skipped, so `None`, `""` and `","` all mean no filter.
    pub fn parse(value: Option<&str>) -> Result<Self, RegionParseError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };

        let ids = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i32>()
                    .map_err(|_| RegionParseError::InvalidId(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ids })
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegionParseError {
    #[error("Invalid region identifier: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let filter = RegionFilter::parse(Some("3003, 3010,,3011")).unwrap();
        assert_eq!(filter.ids(), &[3003, 3010, 3011]);
    }

    #[test]
    fn test_absent_and_blank() {
        assert!(RegionFilter::parse(None).unwrap().is_empty());
        assert!(RegionFilter::parse(Some("")).unwrap().is_empty());
        assert!(RegionFilter::parse(Some(" , ")).unwrap().is_empty());
    }

    #[test]
    fn test_invalid() {
        let err = RegionFilter::parse(Some("3003,lyngen")).unwrap_err();
        assert!(err.to_string().contains("lyngen"));
    }
}
