//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations (content store + credentials)
//! - Entity models

mod database;
mod models;

pub use database::Database;
pub use models::*;
