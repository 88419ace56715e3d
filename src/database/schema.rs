/*!
 * Database schema definitions and version checks.
 *
 * This module contains the SQL schema for the translation records table
 * and refuses databases written with a different schema version.
 */

use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use log::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version != SCHEMA_VERSION {
        return Err(anyhow!(
            "Unsupported database schema v{} (expected v{})",
            current_version, SCHEMA_VERSION
        ));
    } else {
        debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version in the database
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Create all database tables
fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked while a feedback update is written
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    // One row per translation attempt, mutated only by feedback
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS translations (
            transaction_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            model_config_id INTEGER NOT NULL,
            prompt TEXT NOT NULL,
            source_lang TEXT NOT NULL,
            target_lang TEXT NOT NULL,
            response TEXT NOT NULL,
            feedback_state TEXT CHECK (feedback_state IN ('upvote', 'downvote')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_translations_user ON translations(user_id);
        CREATE INDEX IF NOT EXISTS idx_translations_languages ON translations(source_lang, target_lang);
        "#,
    )?;

    debug!("All database tables created successfully");
    Ok(())
}
