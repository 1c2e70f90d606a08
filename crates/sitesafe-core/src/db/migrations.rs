//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0)
        })
        .optional()?
        .flatten()
        .unwrap_or(0);

    Ok(version)
}

/// Apply one migration's statements atomically
fn apply(conn: &Connection, version: i32, statements: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(statements)?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    tx.commit()?;

    tracing::info!("Migrated database to version {version}");
    Ok(())
}

/// Migration to version 1: offline outbox
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        1,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        -- AUTOINCREMENT keeps ids monotonic: a deleted id is never handed out again
        CREATE TABLE IF NOT EXISTS outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            form_type TEXT NOT NULL,
            project_id TEXT NOT NULL,
            submitted_by_id TEXT NOT NULL,
            data TEXT NOT NULL,
            file_name TEXT,
            file_content_type TEXT,
            file_field TEXT,
            file_bytes BLOB,
            created_at INTEGER NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT
        );
        CREATE TABLE IF NOT EXISTS outbox_dead_letters (
            id INTEGER PRIMARY KEY,
            form_type TEXT NOT NULL,
            project_id TEXT NOT NULL,
            submitted_by_id TEXT NOT NULL,
            data TEXT NOT NULL,
            file_name TEXT,
            file_content_type TEXT,
            file_field TEXT,
            file_bytes BLOB,
            created_at INTEGER NOT NULL,
            attempts INTEGER NOT NULL,
            last_error TEXT,
            dead_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_dead_letters_dead_at ON outbox_dead_letters(dead_at DESC);",
    )
}

/// Migration to version 2: local drafts
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        2,
        "CREATE TABLE IF NOT EXISTS drafts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            form_type TEXT NOT NULL,
            project_id TEXT NOT NULL,
            data TEXT NOT NULL,
            saved_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_drafts_saved_at ON drafts(saved_at DESC);
        CREATE INDEX IF NOT EXISTS idx_drafts_form_project ON drafts(form_type, project_id);
        CREATE TABLE IF NOT EXISTS draft_files (
            draft_id INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
            field TEXT NOT NULL,
            file_name TEXT NOT NULL,
            content_type TEXT,
            bytes BLOB NOT NULL,
            PRIMARY KEY (draft_id, field)
        );",
    )
}
