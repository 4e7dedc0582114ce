//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in the projected service CRS (meters).
///
/// The four edges arrive from the map client as west, south, east, north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from the `west/south/east/north` path segments and validate.
    pub fn from_edges(west: f64, south: f64, east: f64, north: f64) -> Result<Self, BboxParseError> {
        let bbox = Self::new(west, south, east, north);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Parse the `west/south/east/north` URL path segments.
    pub fn from_segments(west: &str, south: &str, east: &str, north: &str) -> Result<Self, BboxParseError> {
        let parse = |edge: &'static str, value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber {
                    edge,
                    value: value.to_string(),
                })
        };

        Self::from_edges(
            parse("west", west)?,
            parse("south", south)?,
            parse("east", east)?,
            parse("north", north)?,
        )
    }

    /// Reject NaN and infinite edges. Inverted boxes are left to the database.
    pub fn validate(&self) -> Result<(), BboxParseError> {
        for value in [self.min_x, self.min_y, self.max_x, self.max_y] {
            if !value.is_finite() {
                return Err(BboxParseError::NonFinite(value.to_string()));
            }
        }
        Ok(())
    }

    /// Closed exterior ring, counter-clockwise starting at the south-west corner.
    pub fn ring(&self) -> [(f64, f64); 5] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
            (self.min_x, self.min_y),
        ]
    }

    /// Well-known text polygon of [`ring`](Self::ring), suitable for `ST_GeomFromText`.
    pub fn to_wkt(&self) -> String {
        let coords: Vec<String> = self
            .ring()
            .iter()
            .map(|(x, y)| format!("{} {}", x, y))
            .collect();
        format!("POLYGON(({}))", coords.join(","))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("{edge} edge '{value}' is not a number")]
    InvalidNumber { edge: &'static str, value: String },

    #[error("BBOX coordinates must be finite, got {0}")]
    NonFinite(String),
}
