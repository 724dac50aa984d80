//! Artist and song dimension writes, and the songplay lookup

use sqlx::{PgConnection, PgPool};

use crate::data::postgres::PostgresError;
use crate::data::types::{ArtistRow, SongBatch, SongMatch, SongRow};

/// Write one song file's artist and song atomically
pub async fn write_song_batch(pool: &PgPool, batch: &SongBatch) -> Result<(), PostgresError> {
    let mut tx = pool.begin().await?;

    upsert_artist(&mut *tx, &batch.artist).await?;
    insert_song(&mut *tx, &batch.song).await?;

    tx.commit().await?;
    Ok(())
}

async fn upsert_artist(conn: &mut PgConnection, artist: &ArtistRow) -> Result<(), PostgresError> {
    sqlx::query(
        "INSERT INTO artists (artist_id, name, location, latitude, longitude)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (artist_id) DO UPDATE SET
            name = EXCLUDED.name,
            location = EXCLUDED.location,
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude",
    )
    .bind(&artist.artist_id)
    .bind(&artist.name)
    .bind(&artist.location)
    .bind(artist.latitude)
    .bind(artist.longitude)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_song(conn: &mut PgConnection, song: &SongRow) -> Result<(), PostgresError> {
    sqlx::query(
        "INSERT INTO songs (song_id, title, artist_id, year, duration)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (song_id) DO NOTHING",
    )
    .bind(&song.song_id)
    .bind(&song.title)
    .bind(&song.artist_id)
    .bind(song.year)
    .bind(song.duration)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Resolve song/artist ids by exact title, artist name and duration
pub async fn find_song(
    conn: &mut PgConnection,
    title: &str,
    artist_name: &str,
    duration: f64,
) -> Result<Option<SongMatch>, PostgresError> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT s.song_id, a.artist_id
         FROM songs s
         JOIN artists a ON s.artist_id = a.artist_id
         WHERE s.title = $1 AND a.name = $2 AND s.duration = $3
         ORDER BY s.song_id
         LIMIT 1",
    )
    .bind(title)
    .bind(artist_name)
    .bind(duration)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(song_id, artist_id)| SongMatch { song_id, artist_id }))
}
