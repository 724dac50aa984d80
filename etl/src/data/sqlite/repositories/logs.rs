//! Time/user dimension writes and songplay fact inserts for one log file

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::core::constants::INSERT_BATCH_SIZE;
use crate::data::sqlite::SqliteError;
use crate::data::types::{LogBatch, LogWriteSummary, SongMatch, SongplayEvent, TimeRow, UserRow};

use super::songs::find_song;

/// Write one log file's rows atomically: time, users, then songplays
pub async fn write_log_batch(
    pool: &SqlitePool,
    batch: &LogBatch,
) -> Result<LogWriteSummary, SqliteError> {
    let mut tx = pool.begin().await?;

    insert_time_rows(&mut *tx, &batch.time).await?;
    upsert_users(&mut *tx, &batch.users).await?;
    let summary = insert_songplays(&mut *tx, &batch.songplays).await?;

    tx.commit().await?;
    Ok(summary)
}

/// Insert time rows; an instant already present is skipped
async fn insert_time_rows(conn: &mut SqliteConnection, rows: &[TimeRow]) -> Result<(), SqliteError> {
    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO time (start_time, hour, day, week, month, year, weekday) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(row.start_time)
                .push_bind(row.hour)
                .push_bind(row.day)
                .push_bind(row.week)
                .push_bind(row.month)
                .push_bind(row.year)
                .push_bind(row.weekday.clone());
        });
        builder.push(" ON CONFLICT (start_time) DO NOTHING");
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// Insert users; an existing user takes the latest name, gender and level
async fn upsert_users(conn: &mut SqliteConnection, rows: &[UserRow]) -> Result<(), SqliteError> {
    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO users (user_id, first_name, last_name, gender, level) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(row.user_id)
                .push_bind(row.first_name.clone())
                .push_bind(row.last_name.clone())
                .push_bind(row.gender.clone())
                .push_bind(row.level.clone());
        });
        builder.push(
            " ON CONFLICT (user_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                gender = excluded.gender,
                level = excluded.level",
        );
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

/// Resolve each event's song/artist, then insert the fact rows
async fn insert_songplays(
    conn: &mut SqliteConnection,
    events: &[SongplayEvent],
) -> Result<LogWriteSummary, SqliteError> {
    let mut resolved: Vec<(&SongplayEvent, Option<SongMatch>)> = Vec::with_capacity(events.len());
    for event in events {
        let found = match event.lookup_key() {
            Some((title, artist, length)) => find_song(&mut *conn, title, artist, length).await?,
            None => None,
        };
        resolved.push((event, found));
    }
    let matched = resolved.iter().filter(|(_, found)| found.is_some()).count() as u64;

    for chunk in resolved.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent) ",
        );
        builder.push_values(chunk, |mut b, (event, found)| {
            b.push_bind(event.start_time)
                .push_bind(event.user_id)
                .push_bind(event.level.clone())
                .push_bind(found.as_ref().map(|m| m.song_id.clone()))
                .push_bind(found.as_ref().map(|m| m.artist_id.clone()))
                .push_bind(event.session_id)
                .push_bind(event.location.clone())
                .push_bind(event.user_agent.clone());
        });
        builder.build().execute(&mut *conn).await?;
    }

    Ok(LogWriteSummary {
        songplays: events.len() as u64,
        matched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteService;
    use crate::data::sqlite::repositories::schema::create_tables;
    use crate::data::sqlite::repositories::songs::write_song_batch;
    use crate::data::types::{ArtistRow, SongBatch, SongRow};

    async fn setup() -> SqliteService {
        let db = SqliteService::in_memory().await;
        create_tables(db.pool()).await.unwrap();
        write_song_batch(
            db.pool(),
            &SongBatch {
                artist: ArtistRow {
                    artist_id: "AR1".to_string(),
                    name: "Test Artist".to_string(),
                    location: None,
                    latitude: None,
                    longitude: None,
                },
                song: SongRow {
                    song_id: "S1".to_string(),
                    title: "Test Song".to_string(),
                    artist_id: "AR1".to_string(),
                    year: 2000,
                    duration: 180.5,
                },
            },
        )
        .await
        .unwrap();
        db
    }

    fn time_row(start_time: i64) -> TimeRow {
        TimeRow {
            start_time,
            hour: 0,
            day: 1,
            week: 1,
            month: 1,
            year: 2018,
            weekday: "Monday".to_string(),
        }
    }

    fn user_row(user_id: i64, level: &str) -> UserRow {
        UserRow {
            user_id,
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            gender: Some("F".to_string()),
            level: level.to_string(),
        }
    }

    fn event(start_time: i64, song: &str, artist: &str, length: f64) -> SongplayEvent {
        SongplayEvent {
            start_time,
            user_id: 1,
            level: "free".to_string(),
            session_id: 100,
            location: Some("NYC-NJ".to_string()),
            user_agent: Some("UA".to_string()),
            song: Some(song.to_string()),
            artist: Some(artist.to_string()),
            length: Some(length),
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_log_batch_resolves_matches() {
        let db = setup().await;
        let batch = LogBatch {
            time: vec![time_row(1000), time_row(2000)],
            users: vec![user_row(1, "free")],
            songplays: vec![
                event(1000, "Test Song", "Test Artist", 180.5),
                event(2000, "Unknown Song", "Test Artist", 180.5),
            ],
        };

        let summary = write_log_batch(db.pool(), &batch).await.unwrap();
        assert_eq!(summary.songplays, 2);
        assert_eq!(summary.matched, 1);

        let rows = sqlx::query_as::<_, (i64, Option<String>, Option<String>)>(
            "SELECT start_time, song_id, artist_id FROM songplays ORDER BY songplay_id",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();
        assert_eq!(
            rows,
            vec![
                (1000, Some("S1".to_string()), Some("AR1".to_string())),
                (2000, None, None),
            ]
        );
    }

    #[tokio::test]
    async fn test_time_rows_deduplicated_across_batches() {
        let db = setup().await;
        let batch = LogBatch {
            time: vec![time_row(1000)],
            users: vec![user_row(1, "free")],
            songplays: vec![event(1000, "Test Song", "Test Artist", 180.5)],
        };
        write_log_batch(db.pool(), &batch).await.unwrap();
        write_log_batch(db.pool(), &batch).await.unwrap();

        assert_eq!(count(db.pool(), "time").await, 1);
        assert_eq!(count(db.pool(), "users").await, 1);
        assert_eq!(count(db.pool(), "songplays").await, 2);
    }

    #[tokio::test]
    async fn test_user_level_latest_write_wins() {
        let db = setup().await;
        let free = LogBatch {
            users: vec![user_row(1, "free")],
            ..Default::default()
        };
        let paid = LogBatch {
            users: vec![user_row(1, "paid")],
            ..Default::default()
        };
        write_log_batch(db.pool(), &free).await.unwrap();
        write_log_batch(db.pool(), &paid).await.unwrap();

        let level: String = sqlx::query_scalar("SELECT level FROM users WHERE user_id = 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(level, "paid");
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let db = setup().await;
        let summary = write_log_batch(db.pool(), &LogBatch::default())
            .await
            .unwrap();

        assert_eq!(summary, LogWriteSummary::default());
        assert_eq!(count(db.pool(), "time").await, 0);
        assert_eq!(count(db.pool(), "users").await, 0);
        assert_eq!(count(db.pool(), "songplays").await, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let db = setup().await;
        // The songplay references a time row that is not part of the batch
        let batch = LogBatch {
            time: vec![time_row(1000)],
            users: vec![user_row(1, "free")],
            songplays: vec![event(5000, "Test Song", "Test Artist", 180.5)],
        };

        assert!(write_log_batch(db.pool(), &batch).await.is_err());
        assert_eq!(count(db.pool(), "time").await, 0);
        assert_eq!(count(db.pool(), "users").await, 0);
    }

    #[tokio::test]
    async fn test_large_batch_is_chunked() {
        let db = setup().await;
        let n = INSERT_BATCH_SIZE as i64 * 2 + 7;
        let batch = LogBatch {
            time: (0..n).map(time_row).collect(),
            users: vec![user_row(1, "free")],
            songplays: (0..n)
                .map(|t| event(t, "Test Song", "Test Artist", 180.5))
                .collect(),
        };

        let summary = write_log_batch(db.pool(), &batch).await.unwrap();
        assert_eq!(summary.songplays, n as u64);
        assert_eq!(summary.matched, n as u64);
        assert_eq!(count(db.pool(), "time").await, n);
        assert_eq!(count(db.pool(), "songplays").await, n);
    }
}
