//! The store's SQLite handle.
//!
//! One background thread owns the connection. Callers hand it closures and
//! await the result, so a slow statement never blocks a tokio worker, and
//! reads, writes and transaction control all run in submission order.
//!
//! ```ignore
//! let db = AsyncDatabase::open(&paths.database_file("playa.sqlite")).await?;
//! let names = db
//!     .call_sqlite(|conn| {
//!         let mut stmt = conn.prepare("SELECT name FROM camps")?;
//!         let rows = stmt.query_map([], |row| row.get(0))?;
//!         rows.collect::<Result<Vec<String>, _>>()
//!     })
//!     .await?;
//! ```

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

const IN_MEMORY_PATH: &str = ":memory:";

const FILE_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA cache_size = -16000;
    PRAGMA temp_store = MEMORY;
    PRAGMA busy_timeout = 5000;
";

// WAL does not apply to in-memory databases.
const MEMORY_PRAGMAS: &str = "PRAGMA temp_store = MEMORY;";

fn executor_error(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::ConnectionClosed => {
            DatabaseError::Connection("executor thread has shut down".to_string())
        }
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Cloneable handle to the executor thread. Clones share the connection.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    path: String,
}

impl AsyncDatabase {
    /// Open (or create) the database file, tune it and bring the schema up
    /// to [`crate::CURRENT_VERSION`]. Missing parent directories are created.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path_str = path.to_string_lossy().into_owned();
        debug!(path = %path_str, "Opening store");

        let conn = Connection::open(path)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        let db = Self::prepare(conn, path_str, FILE_PRAGMAS).await?;

        info!(path = %db.path, "Store ready");
        Ok(db)
    }

    /// A fresh, empty store that lives only as long as its handles.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Self::prepare(conn, IN_MEMORY_PATH.to_string(), MEMORY_PRAGMAS).await
    }

    async fn prepare(conn: Connection, path: String, pragmas: &'static str) -> DatabaseResult<Self> {
        let db = Self { conn, path };
        db.call_sqlite(move |conn| conn.execute_batch(pragmas)).await?;
        db.call(|conn| {
            migrations::run_migrations(conn).map_err(|e| DatabaseError::Migration(e.to_string()))
        })
        .await?;
        Ok(db)
    }

    /// Run `f` on the executor thread.
    ///
    /// Keep closures to SQL and row mapping: while one runs, every other
    /// query and live query re-run waits behind it.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // The closure's own result travels inside the executor's Ok.
        match self.conn.call(move |conn| Ok(f(conn))).await {
            Ok(result) => result,
            Err(e) => Err(executor_error(e)),
        }
    }

    /// [`AsyncDatabase::call`] for closures that only fail with rusqlite errors.
    pub async fn call_sqlite<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(executor_error)
    }

    /// File path, or `:memory:`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Shut the executor thread down once queued calls finish. Calls through
    /// other clones fail afterwards.
    pub async fn close(self) -> DatabaseResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("close failed: {e:?}")))?;
        info!(path = %self.path, "Store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_file_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let db = AsyncDatabase::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        let mode: String = db
            .call_sqlite(|conn| conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[tokio::test]
    async fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("playa.db");

        let db = AsyncDatabase::open(&db_path).await.unwrap();
        assert_eq!(db.path(), db_path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_in_memory_has_schema() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();
        assert_eq!(db.path(), ":memory:");

        let count: i64 = db
            .call_sqlite(|conn| conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_serialized() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();

        db.call_sqlite(|conn| {
            conn.execute("INSERT INTO camps (name) VALUES ('Counter')", [])
        })
        .await
        .unwrap();

        let mut handles = vec![];
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.call_sqlite(move |conn| {
                    conn.execute(
                        "INSERT INTO camps (name) VALUES (?1)",
                        [format!("Camp {i}")],
                    )
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let count: i64 = db
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM camps", [], |row| row.get(0))
                    .map_err(DatabaseError::from)
            })
            .await
            .unwrap();
        assert_eq!(count, 11);
    }

    #[tokio::test]
    async fn test_call_after_close_fails() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();
        let clone = db.clone();
        db.close().await.unwrap();

        let after = clone.call_sqlite(|conn| conn.execute_batch("SELECT 1")).await;
        assert!(matches!(after, Err(DatabaseError::Connection(_))));
    }
}
