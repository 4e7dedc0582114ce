//! Coordinate Reference System codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// CRS codes the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CrsCode {
    /// ETRS89 / UTM zone 33N (meters). Storage and map projection.
    #[default]
    Epsg25833,
}

impl CrsCode {
    /// PostGIS SRID for this CRS.
    pub fn srid(&self) -> i32 {
        match self {
            CrsCode::Epsg25833 => 25833,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Epsg25833 => "EPSG:25833",
        };
        write!(f, "{}", code)
    }
}
