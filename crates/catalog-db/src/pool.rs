//! Connection pool creation and configuration.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// Busy timeout for SQLite connections, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    pub pool_max_size: u32,

    /// Refuse writes on every pooled connection (`PRAGMA query_only`).
    ///
    /// The API server only reads; the loader is the sole writer and opens
    /// its own writable pool.
    pub read_only: bool,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
            read_only: false,
        }
    }
}

impl DbRuntimeSettings {
    /// The same settings with writes refused.
    pub fn read_only(self) -> Self {
        Self {
            read_only: true,
            ..self
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to build the connection pool.
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Creates a new SQLite connection pool with WAL mode enabled.
///
/// The database file is created if it does not exist yet, so the server can
/// start before the first load; queries then fail until the loader has run.
/// WAL lets a read-only server pool keep answering while `catalog-load`
/// replaces the table: readers see the old table until the load commits.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the connection pool cannot be created.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| {
            // In-memory databases report "memory", which is acceptable.
            let journal_mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            if journal_mode != "wal" && journal_mode != "memory" {
                return Err(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                    Some(format!(
                        "failed to set WAL journal mode, got: {}",
                        journal_mode
                    )),
                ));
            }
            conn.execute_batch(&format!(
                "PRAGMA busy_timeout = {};",
                settings.busy_timeout_ms
            ))?;
            // Set last: the journal mode switch above may itself write.
            if settings.read_only {
                conn.execute_batch("PRAGMA query_only = ON;")?;
            }
            Ok(())
        });

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        max_size = settings.pool_max_size,
        read_only = settings.read_only,
        "created database pool"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_file_pool() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("catalog.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 2_500,
            pool_max_size: 3,
            read_only: false,
        };

        let pool = create_pool(path.to_str().unwrap(), settings)
            .expect("pool creation should succeed");
        let conn = pool.get().expect("should get a connection");

        let mode: String = conn
            .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
            .expect("should query journal_mode");
        assert_eq!(mode, "wal");

        let busy_timeout: i32 = conn
            .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
            .expect("should query busy_timeout");
        assert_eq!(busy_timeout, 2_500, "busy timeout should match settings");

        assert_eq!(pool.max_size(), 3, "pool max size should match settings");
        assert!(path.exists(), "database file should be created");
    }

    #[test]
    fn connections_return_to_pool_on_drop() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("catalog.db");
        let settings = DbRuntimeSettings {
            busy_timeout_ms: 1_000,
            pool_max_size: 1,
            read_only: false,
        };
        let pool = create_pool(path.to_str().unwrap(), settings).unwrap();

        for _ in 0..3 {
            let conn = pool.get().expect("single connection should be reusable");
            let failed = conn.execute_batch("SELECT * FROM missing_table;");
            assert!(failed.is_err());
        }
        assert_eq!(pool.state().idle_connections, 1);
    }

    #[test]
    fn read_only_pool_refuses_writes_but_sees_loads() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("catalog.db");
        let path = path.to_str().unwrap();

        let writer = create_pool(path, DbRuntimeSettings::default()).unwrap();
        let reader = create_pool(path, DbRuntimeSettings::default().read_only()).unwrap();

        writer
            .get()
            .unwrap()
            .execute_batch("CREATE TABLE products (id INTEGER); INSERT INTO products VALUES (1);")
            .expect("writable pool should accept writes");

        let conn = reader.get().unwrap();
        let query_only: i32 = conn
            .query_row("PRAGMA query_only;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(query_only, 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        assert!(conn.execute("INSERT INTO products VALUES (2)", []).is_err());
        assert!(conn.execute_batch("DROP TABLE products;").is_err());
    }
}
