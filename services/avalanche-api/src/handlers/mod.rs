//! HTTP request handlers for the avalanche API.

pub mod common;
pub mod events;
pub mod health;
pub mod proxy;
pub mod statistics;
