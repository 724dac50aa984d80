//! Sparkify ETL
//!
//! Loads song metadata files and user activity logs into a star schema
//! (songplays fact table; users, songs, artists and time dimensions).

pub mod app;
pub mod core;
pub mod data;
pub mod pipeline;
