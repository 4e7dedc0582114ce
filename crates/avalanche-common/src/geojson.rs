//! GeoJSON output types.
//!
//! Geometry and properties come out of the database as JSON already, so
//! they are carried as opaque [`serde_json::Value`]s.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crs::CrsCode;

/// A GeoJSON FeatureCollection tagged with a named CRS.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Coordinate reference system of every geometry in the collection.
    pub crs: NamedCrs,

    /// Array of features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection in the given CRS.
    pub fn new(crs: CrsCode) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            crs: NamedCrs::new(crs),
            features: Vec::new(),
        }
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    pub geometry: Value,

    pub properties: Value,
}

impl Feature {
    pub fn new(geometry: Value, properties: Value) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry,
            properties,
        }
    }

    /// Build a feature from the JSON text columns produced by the database.
    pub fn from_json_text(geometry: &str, properties: Option<&str>) -> Result<Self, serde_json::Error> {
        let geometry = serde_json::from_str(geometry)?;
        let properties = match properties {
            Some(text) => serde_json::from_str(text)?,
            None => Value::Object(Default::default()),
        };
        Ok(Self::new(geometry, properties))
    }
}

/// The legacy GeoJSON `crs` member: `{"type": "name", "properties": {"name": "EPSG:25833"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub type_: String,

    pub properties: NamedCrsProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCrsProperties {
    pub name: String,
}

impl NamedCrs {
    pub fn new(crs: CrsCode) -> Self {
        Self {
            type_: "name".to_string(),
            properties: NamedCrsProperties {
                name: crs.to_string(),
            },
        }
    }
}
