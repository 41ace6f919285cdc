//! Database access layer for pulsemap-api

pub mod posts;
pub mod sessions;
pub mod users;
