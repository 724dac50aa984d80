//! SQLite repository operations, grouped by concern

pub mod logs;
pub mod schema;
pub mod songs;
pub mod stats;
