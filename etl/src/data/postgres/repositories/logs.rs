//! Time/user dimension writes and songplay fact inserts for one log file

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::core::constants::INSERT_BATCH_SIZE;
use crate::data::postgres::PostgresError;
use crate::data::types::{LogBatch, LogWriteSummary, SongMatch, SongplayEvent, TimeRow, UserRow};

use super::songs::find_song;

/// Write one log file's rows atomically: time, users, then songplays
pub async fn write_log_batch(
    pool: &PgPool,
    batch: &LogBatch,
) -> Result<LogWriteSummary, PostgresError> {
    let mut tx = pool.begin().await?;

    insert_time_rows(&mut *tx, &batch.time).await?;
    upsert_users(&mut *tx, &batch.users).await?;
    let summary = insert_songplays(&mut *tx, &batch.songplays).await?;

    tx.commit().await?;
    Ok(summary)
}

async fn insert_time_rows(conn: &mut PgConnection, rows: &[TimeRow]) -> Result<(), PostgresError> {
    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<Postgres>::new(
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

/// Rows must have distinct user ids: PostgreSQL rejects a statement that
/// updates the same row twice.
async fn upsert_users(conn: &mut PgConnection, rows: &[UserRow]) -> Result<(), PostgresError> {
    for chunk in rows.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<Postgres>::new(
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
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                gender = EXCLUDED.gender,
                level = EXCLUDED.level",
        );
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}

async fn insert_songplays(
    conn: &mut PgConnection,
    events: &[SongplayEvent],
) -> Result<LogWriteSummary, PostgresError> {
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
        let mut builder = QueryBuilder::<Postgres>::new(
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
