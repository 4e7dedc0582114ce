//! Common types and utilities shared by the avalanche map services.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geojson;
pub mod region;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::ApiError;
pub use geojson::{Feature, FeatureCollection, NamedCrs};
pub use region::RegionFilter;
pub use time::DateRange;
