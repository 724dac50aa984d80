//! Artist and song dimension writes, and the songplay lookup

use sqlx::{SqliteConnection, SqlitePool};

use crate::data::sqlite::SqliteError;
use crate::data::types::{ArtistRow, SongBatch, SongMatch, SongRow};

/// Write one song file's artist and song atomically
pub async fn write_song_batch(pool: &SqlitePool, batch: &SongBatch) -> Result<(), SqliteError> {
    let mut tx = pool.begin().await?;

    // Artist first, the song references it
    upsert_artist(&mut *tx, &batch.artist).await?;
    insert_song(&mut *tx, &batch.song).await?;

    tx.commit().await?;
    Ok(())
}

/// Insert an artist; a re-ingested artist takes the latest attributes
async fn upsert_artist(conn: &mut SqliteConnection, artist: &ArtistRow) -> Result<(), SqliteError> {
    sqlx::query(
        "INSERT INTO artists (artist_id, name, location, latitude, longitude)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (artist_id) DO UPDATE SET
            name = excluded.name,
            location = excluded.location,
            latitude = excluded.latitude,
            longitude = excluded.longitude",
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

/// Insert a song; a re-ingested song is left untouched
async fn insert_song(conn: &mut SqliteConnection, song: &SongRow) -> Result<(), SqliteError> {
    sqlx::query(
        "INSERT INTO songs (song_id, title, artist_id, year, duration)
         VALUES (?, ?, ?, ?, ?)
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
    conn: &mut SqliteConnection,
    title: &str,
    artist_name: &str,
    duration: f64,
) -> Result<Option<SongMatch>, SqliteError> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT s.song_id, a.artist_id
         FROM songs s
         JOIN artists a ON s.artist_id = a.artist_id
         WHERE s.title = ? AND a.name = ? AND s.duration = ?
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;
    use crate::data::sqlite::repositories::schema::create_tables;

    async fn setup() -> SqliteService {
        let db = SqliteService::in_memory().await;
        create_tables(db.pool()).await.unwrap();
        db
    }

    fn batch(artist_id: &str, artist_name: &str, song_id: &str, title: &str) -> SongBatch {
        SongBatch {
            artist: ArtistRow {
                artist_id: artist_id.to_string(),
                name: artist_name.to_string(),
                location: Some("NYC".to_string()),
                latitude: Some(40.7),
                longitude: Some(-74.0),
            },
            song: SongRow {
                song_id: song_id.to_string(),
                title: title.to_string(),
                artist_id: artist_id.to_string(),
                year: 2000,
                duration: 180.5,
            },
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_song_batch() {
        let db = setup().await;
        write_song_batch(db.pool(), &batch("AR1", "Test Artist", "S1", "Test Song"))
            .await
            .unwrap();

        assert_eq!(count(db.pool(), "artists").await, 1);
        assert_eq!(count(db.pool(), "songs").await, 1);

        let artist_id: String =
            sqlx::query_scalar("SELECT artist_id FROM songs WHERE song_id = 'S1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(artist_id, "AR1");
    }

    #[tokio::test]
    async fn test_reingest_same_song_file() {
        let db = setup().await;
        let b = batch("AR1", "Test Artist", "S1", "Test Song");
        write_song_batch(db.pool(), &b).await.unwrap();
        write_song_batch(db.pool(), &b).await.unwrap();

        assert_eq!(count(db.pool(), "artists").await, 1);
        assert_eq!(count(db.pool(), "songs").await, 1);
    }

    #[tokio::test]
    async fn test_artist_latest_write_wins() {
        let db = setup().await;
        write_song_batch(db.pool(), &batch("AR1", "Old Name", "S1", "One"))
            .await
            .unwrap();
        write_song_batch(db.pool(), &batch("AR1", "New Name", "S2", "Two"))
            .await
            .unwrap();

        let name: String = sqlx::query_scalar("SELECT name FROM artists WHERE artist_id = 'AR1'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(name, "New Name");
        assert_eq!(count(db.pool(), "songs").await, 2);
    }

    #[tokio::test]
    async fn test_find_song_hit_and_miss() {
        let db = setup().await;
        write_song_batch(db.pool(), &batch("AR1", "Test Artist", "S1", "Test Song"))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let hit = find_song(&mut conn, "Test Song", "Test Artist", 180.5)
            .await
            .unwrap();
        assert_eq!(
            hit,
            Some(SongMatch {
                song_id: "S1".to_string(),
                artist_id: "AR1".to_string(),
            })
        );

        let wrong_length = find_song(&mut conn, "Test Song", "Test Artist", 181.0)
            .await
            .unwrap();
        assert!(wrong_length.is_none());

        let wrong_artist = find_song(&mut conn, "Test Song", "Someone Else", 180.5)
            .await
            .unwrap();
        assert!(wrong_artist.is_none());
    }

    #[tokio::test]
    async fn test_find_song_ambiguous_key_takes_lowest_song_id() {
        let db = setup().await;
        write_song_batch(db.pool(), &batch("AR1", "Same", "S9", "T"))
            .await
            .unwrap();
        write_song_batch(db.pool(), &batch("AR2", "Same", "S2", "T"))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let found = find_song(&mut conn, "T", "Same", 180.5).await.unwrap();
        assert_eq!(
            found,
            Some(SongMatch {
                song_id: "S2".to_string(),
                artist_id: "AR2".to_string(),
            })
        );
    }
}
