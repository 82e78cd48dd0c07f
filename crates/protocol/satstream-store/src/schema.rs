//! SQL schema initialization.
//!
//! This module defines the database schema for SQLite storage.

use rusqlite::Connection;

use crate::error::Result;

/// Schema version for migration tracking.
pub const SCHEMA_VERSION: u32 = 1;

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist.
/// This function is idempotent - calling it multiple times is safe.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // Enable WAL mode for better concurrent read/write performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    // Create schema version table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    // Check current version
    let current_version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    match current_version {
        None => {
            // Fresh database - create all tables
            create_tables(conn)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }
        Some(version) if version < SCHEMA_VERSION => {
            // Apply migrations
            migrate_schema(conn, version)?;
            conn.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION])?;
        }
        Some(_) => {
            // Current version is up to date
        }
    }

    Ok(())
}

/// Apply schema migrations from the given version to the current version.
fn migrate_schema(_conn: &Connection, _from_version: u32) -> Result<()> {
    // No migrations exist yet for schema version 1.
    Ok(())
}

/// Create all database tables.
fn create_tables(conn: &Connection) -> Result<()> {
    // Session payment records
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            payment_token TEXT,
            face_value INTEGER NOT NULL,
            balance INTEGER NOT NULL,
            spent INTEGER NOT NULL,
            topups INTEGER NOT NULL,
            topup_tokens TEXT NOT NULL DEFAULT '[]',
            status INTEGER NOT NULL,
            refund_token TEXT,
            refund_claimed INTEGER NOT NULL DEFAULT 0,
            cost_per_operation INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at)",
        [],
    )?;

    // Recovery log: append-only, full token text.
    // Tokens are bearer instruments - a truncated copy cannot recover funds,
    // so the full text is stored and rows are never updated or deleted.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS recovery_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL,
            reason INTEGER NOT NULL,
            token TEXT NOT NULL,
            amount INTEGER,
            logged_at INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_recovery_log_session ON recovery_log(session_id)",
        [],
    )?;

    Ok(())
}
