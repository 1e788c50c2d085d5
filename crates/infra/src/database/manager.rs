//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eventsync_domain::{DatabaseConfig, EventSyncError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Owns the connection pool shared by every SQLite repository.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl DbManager {
    /// Open (or create) the database at `config.path`.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let path = config.path.clone();
        let busy_timeout = config.busy_timeout;

        let manager = SqliteConnectionManager::file(&path)
            .with_init(move |conn| apply_connection_pragmas(conn, busy_timeout));

        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .connection_timeout(busy_timeout.max(Duration::from_secs(1)))
            .build(manager)
            .map_err(|e| EventSyncError::from(InfraError::from(e)))?;

        info!(
            db_path = %path.display(),
            max_connections = config.pool_size.max(1),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(|e| InfraError::from(e).into())
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

/// WAL for concurrent readers, foreign keys on, and a busy timeout so that
/// competing workers wait instead of failing.
fn apply_connection_pragmas(
    conn: &mut rusqlite::Connection,
    busy_timeout: Duration,
) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         PRAGMA foreign_keys=ON;",
    )?;
    conn.busy_timeout(busy_timeout)
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> EventSyncError {
    EventSyncError::from(InfraError::from(err))
}
