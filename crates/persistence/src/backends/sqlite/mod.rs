//! SQLite relational backend.
//!
//! Holds the single evolving records table. Supports in-memory databases
//! (for tests and embedded use) and file-based databases behind an `r2d2`
//! connection pool.
//!
//! # Example
//!
//! ```no_run
//! use strata_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Create an in-memory database; the schema is initialized on open
//! let backend = SqliteBackend::in_memory()?;
//!
//! // Or use a file-based database
//! let backend = SqliteBackend::open("./data/records.db")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE schema_version (
//!     version INTEGER NOT NULL
//! );
//!
//! -- Columns beyond the join fields are added as fields are promoted
//! CREATE TABLE ingested_records (
//!     _row_id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     username TEXT NOT NULL,
//!     sys_ingested_at TIMESTAMP NOT NULL UNIQUE,
//!     t_stamp TEXT
//! );
//! CREATE INDEX idx_username ON ingested_records (username);
//! ```

mod backend;
mod schema;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::{RECORDS_TABLE, ROW_ID_COLUMN, SCHEMA_VERSION};
