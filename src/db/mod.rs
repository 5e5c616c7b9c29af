mod from_row;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;
use crate::keygen::KeyGenerator;

pub type DbPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub keys: Arc<dyn KeyGenerator>,
    /// How many fresh values issuance tries before giving up on collisions.
    pub key_generation_attempts: u32,
}

/// Open a file-backed pool and make sure the schema exists.
///
/// Connections run in WAL mode with a busy timeout, so concurrent IMMEDIATE
/// transactions wait for each other instead of failing with `SQLITE_BUSY`.
pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        configure(conn)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
    });
    let pool = Pool::builder().build(manager)?;
    let conn = pool.get()?;
    init_db(&conn)?;
    drop(conn);
    Ok(pool)
}

/// In-memory pool. Every SQLite memory connection is its own database, so
/// the pool holds exactly one connection.
pub fn create_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory().with_init(configure);
    let pool = Pool::builder().max_size(1).build(manager)?;
    let conn = pool.get()?;
    init_db(&conn)?;
    drop(conn);
    Ok(pool)
}

fn configure(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            alias TEXT UNIQUE,
            duration_quantity INTEGER NOT NULL CHECK (duration_quantity > 0),
            duration_unit TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS license_keys (
            id TEXT PRIMARY KEY,
            value TEXT NOT NULL UNIQUE,
            service_id TEXT NOT NULL,
            plan_id TEXT REFERENCES plans(id) ON DELETE SET NULL,
            identifier TEXT,
            activated_at INTEGER,
            expires_at INTEGER,
            extra TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_license_keys_binding
            ON license_keys(identifier, service_id, expires_at);
        CREATE INDEX IF NOT EXISTS idx_license_keys_service
            ON license_keys(service_id, created_at);
        ",
    )?;
    Ok(())
}
