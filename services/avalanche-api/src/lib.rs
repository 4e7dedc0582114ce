//! Avalanche API Service Library
//!
//! HTTP server for avalanche event GeoJSON, aggregate statistics and the
//! referer-gated imagery proxy.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod state;
