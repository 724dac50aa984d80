//! Read-side queries: table counts and songplay listing

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{SongplayRow, TableCounts};

type SongplayTuple = (
    i64,
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    i64,
    Option<String>,
    Option<String>,
);

pub async fn table_counts(pool: &SqlitePool) -> Result<TableCounts, SqliteError> {
    let (songplays, users, songs, artists, time) =
        sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM songplays),
                (SELECT COUNT(*) FROM users),
                (SELECT COUNT(*) FROM songs),
                (SELECT COUNT(*) FROM artists),
                (SELECT COUNT(*) FROM time)",
        )
        .fetch_one(pool)
        .await?;

    Ok(TableCounts {
        songplays,
        users,
        songs,
        artists,
        time,
    })
}

pub async fn list_songplays(pool: &SqlitePool) -> Result<Vec<SongplayRow>, SqliteError> {
    let rows = sqlx::query_as::<_, SongplayTuple>(
        "SELECT songplay_id, start_time, user_id, level, song_id, artist_id, session_id, location, user_agent
         FROM songplays
         ORDER BY songplay_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(
                songplay_id,
                start_time,
                user_id,
                level,
                song_id,
                artist_id,
                session_id,
                location,
                user_agent,
            )| SongplayRow {
                songplay_id,
                start_time,
                user_id,
                level,
                song_id,
                artist_id,
                session_id,
                location,
                user_agent,
            },
        )
        .collect())
}
