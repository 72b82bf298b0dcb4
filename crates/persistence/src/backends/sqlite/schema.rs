//! SQLite schema definitions and migrations.

use rusqlite::Connection;

use crate::error::{BackendError, BackendResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Name of the single evolving table.
pub const RECORDS_TABLE: &str = "ingested_records";

/// Surrogate key column. Normalized field names never start with `_`, so it
/// cannot collide with an evolved column.
pub const ROW_ID_COLUMN: &str = "_row_id";

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> BackendResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(internal_error(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> BackendResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> BackendResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| internal_error(format!("Failed to clear schema_version: {}", e)))?;

    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .map_err(|e| internal_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

/// Create the initial schema (version 1): the records table with the three
/// join columns. Every other column is added at runtime.
fn create_schema_v1(conn: &Connection) -> BackendResult<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                {row_id} INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                sys_ingested_at TIMESTAMP NOT NULL UNIQUE,
                t_stamp TEXT
            )",
            table = RECORDS_TABLE,
            row_id = ROW_ID_COLUMN,
        ),
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create {} table: {}", RECORDS_TABLE, e)))?;

    conn.execute(
        &format!(
            "CREATE INDEX IF NOT EXISTS idx_username ON {} (username)",
            RECORDS_TABLE
        ),
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create username index: {}", e)))?;

    Ok(())
}

/// Quotes an identifier for use in DDL and DML.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Name of the unique index for a column.
pub fn unique_index_name(column: &str) -> String {
    format!("idx_{}", column)
}

fn internal_error(message: String) -> BackendError {
    BackendError::Internal {
        backend_name: "sqlite".to_string(),
        message,
        source: None,
    }
}
