use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA cache_size = -32000;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version)
}

// Decimals are TEXT: the shortest string that round-trips the f64.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE CHECK (length(username) > 0),
    created_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER))
);

CREATE TABLE IF NOT EXISTS calculations (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users (id),
    parent_id INTEGER REFERENCES calculations (id),
    value TEXT NOT NULL,
    operation TEXT CHECK (operation IN ('+', '-', '*', '/')),
    operand TEXT,
    created_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER)),
    CHECK (
        (parent_id IS NULL AND operation IS NULL AND operand IS NULL)
        OR (parent_id IS NOT NULL AND operation IS NOT NULL AND operand IS NOT NULL)
    )
);
CREATE INDEX IF NOT EXISTS idx_calculations_parent ON calculations (parent_id, created_at, id);
CREATE INDEX IF NOT EXISTS idx_calculations_created ON calculations (created_at, id);

CREATE TRIGGER IF NOT EXISTS calculations_no_update BEFORE UPDATE ON calculations
BEGIN
    SELECT RAISE(ABORT, 'calculations are append-only');
END;
CREATE TRIGGER IF NOT EXISTS calculations_no_delete BEFORE DELETE ON calculations
BEGIN
    SELECT RAISE(ABORT, 'calculations are append-only');
END;
";
