//! Database migrations.
//!
//! This module contains all SQL migrations for the database schema.
//! Migrations are run in order and tracked in the `migrations` table.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_initial_schema(conn)?;
    }
    if current_version < 2 {
        migrate_v2_lookup_indexes(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: Initial schema - one table per category.
///
/// `AUTOINCREMENT` keeps row ids from being reused after a table is cleared.
fn migrate_v1_initial_schema(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: initial schema");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS arts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playa_id TEXT UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            url TEXT,
            contact TEXT,
            playa_address TEXT,
            latitude REAL,
            longitude REAL,
            favorite INTEGER NOT NULL DEFAULT 0,
            artist TEXT NOT NULL DEFAULT '',
            artist_location TEXT NOT NULL DEFAULT '',
            image_url TEXT,
            audio_tour_url TEXT
        );

        CREATE TABLE IF NOT EXISTS camps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playa_id TEXT UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            url TEXT,
            contact TEXT,
            playa_address TEXT,
            latitude REAL,
            longitude REAL,
            favorite INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playa_id TEXT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            url TEXT,
            contact TEXT,
            playa_address TEXT,
            latitude REAL,
            longitude REAL,
            favorite INTEGER NOT NULL DEFAULT 0,
            event_type TEXT NOT NULL DEFAULT '',
            all_day INTEGER NOT NULL DEFAULT 0,
            check_location INTEGER NOT NULL DEFAULT 0,
            camp_playa_id TEXT,
            start_time INTEGER NOT NULL,
            start_time_pretty TEXT NOT NULL DEFAULT '',
            end_time INTEGER NOT NULL,
            end_time_pretty TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS user_pois (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            playa_id TEXT UNIQUE,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            url TEXT,
            contact TEXT,
            playa_address TEXT,
            latitude REAL,
            longitude REAL,
            favorite INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;

    record_migration(conn, 1, "initial_schema")?;
    Ok(())
}

/// V2: Indexes backing the fixed query shapes.
///
/// Event occurrences share a playa id, so events get a plain index rather
/// than a unique constraint.
fn migrate_v2_lookup_indexes(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: lookup indexes");

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_arts_name ON arts(name);
        CREATE INDEX IF NOT EXISTS idx_arts_favorite ON arts(favorite);
        CREATE INDEX IF NOT EXISTS idx_camps_name ON camps(name);
        CREATE INDEX IF NOT EXISTS idx_camps_favorite ON camps(favorite);
        CREATE INDEX IF NOT EXISTS idx_events_playa_id ON events(playa_id);
        CREATE INDEX IF NOT EXISTS idx_events_name ON events(name);
        CREATE INDEX IF NOT EXISTS idx_events_start_time ON events(start_time);
        CREATE INDEX IF NOT EXISTS idx_events_camp_playa_id ON events(camp_playa_id);
        CREATE INDEX IF NOT EXISTS idx_events_location ON events(latitude, longitude);
        ",
    )?;

    record_migration(conn, 2, "lookup_indexes")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_create_category_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["arts", "camps", "events", "user_pois"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);

        let applied: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(applied, i64::from(CURRENT_VERSION));
    }

    #[test]
    fn test_camp_playa_id_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute("INSERT INTO camps (playa_id, name) VALUES ('C1', 'One')", [])
            .unwrap();
        let duplicate =
            conn.execute("INSERT INTO camps (playa_id, name) VALUES ('C1', 'Two')", []);
        assert!(duplicate.is_err());
    }
}
