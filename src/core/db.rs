use anyhow::{Error, Result};
use rusqlite::Connection as SyncConnection;
use tokio_rusqlite::Connection;

/// Schema changes applied in order. The index of each entry plus one
/// is the `user_version` the database is at once it has run.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profile (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        full_name TEXT,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE IF NOT EXISTS booking (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES profile(id),
        external_booking_id TEXT NOT NULL UNIQUE,
        event_type_id TEXT,
        title TEXT,
        description TEXT,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        attendee_name TEXT,
        attendee_email TEXT,
        attendee_timezone TEXT,
        status TEXT NOT NULL,
        metadata TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS booking_user_start_idx ON booking(user_id, start_time);
    "#,
];

pub async fn async_db(db_path: &str) -> Result<Connection, Error> {
    let db = Connection::open(db_path).await?;
    db.call(|conn| {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    })
    .await?;
    Ok(db)
}

/// Create the schema from scratch. Safe to run against an existing
/// database since every migration is idempotent.
pub fn initialize_db(conn: &mut SyncConnection) -> Result<usize, rusqlite::Error> {
    migrate_db(conn)
}

/// Apply any migrations the database hasn't seen yet. Returns the
/// number of migrations that ran.
pub fn migrate_db(conn: &mut SyncConnection) -> Result<usize, rusqlite::Error> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let pending = MIGRATIONS.iter().enumerate().skip(version as usize);

    let tx = conn.transaction()?;
    let mut applied = 0;
    for (idx, sql) in pending {
        tracing::debug!("Applying migration {}", idx + 1);
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", (idx + 1) as i64)?;
        applied += 1;
    }
    tx.commit()?;

    Ok(applied)
}
