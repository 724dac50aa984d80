//! SQLite schema definitions
//!
//! Star schema: `songplays` fact table referencing the `users`, `songs`,
//! `artists` and `time` dimensions. Statements run one by one, in order.

/// Drop order: fact table first, then dimensions referenced by it
pub const DROP_TABLE_QUERIES: [&str; 5] = [
    "DROP TABLE IF EXISTS songplays",
    "DROP TABLE IF EXISTS users",
    "DROP TABLE IF EXISTS songs",
    "DROP TABLE IF EXISTS artists",
    "DROP TABLE IF EXISTS time",
];

/// Create order: referenced tables before the tables referencing them
pub const CREATE_TABLE_QUERIES: [&str; 7] = [
    r#"
    CREATE TABLE IF NOT EXISTS artists (
        artist_id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        location TEXT,
        latitude REAL,
        longitude REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS songs (
        song_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        artist_id TEXT NOT NULL REFERENCES artists(artist_id),
        year INTEGER NOT NULL,
        duration REAL NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        first_name TEXT,
        last_name TEXT,
        gender TEXT,
        level TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS time (
        start_time INTEGER PRIMARY KEY,
        hour INTEGER NOT NULL,
        day INTEGER NOT NULL,
        week INTEGER NOT NULL,
        month INTEGER NOT NULL,
        year INTEGER NOT NULL,
        weekday TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS songplays (
        songplay_id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time INTEGER NOT NULL REFERENCES time(start_time),
        user_id INTEGER NOT NULL REFERENCES users(user_id),
        level TEXT NOT NULL,
        song_id TEXT REFERENCES songs(song_id),
        artist_id TEXT REFERENCES artists(artist_id),
        session_id INTEGER NOT NULL,
        location TEXT,
        user_agent TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_songs_title_duration ON songs(title, duration)",
    "CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name)",
];

/// Tables of the star schema, in drop order
pub const TABLES: [&str; 5] = ["songplays", "users", "songs", "artists", "time"];
