//! # Configuration Module
//!
//! Service settings and the validated per-game request.

pub mod config;
pub mod request;

pub use config::{ServiceConfig, parse_duration};
pub use request::{GameAssetRequest, GameId, GameRecord};
