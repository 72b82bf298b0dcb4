//! Backend abstractions for the two storage targets.
//!
//! The engine writes every record to at most two places: one evolving
//! relational table and one document collection. [`RelationalBackend`] and
//! [`DocumentBackend`] describe the operations the writer needs from each.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BackendResult;
use crate::types::{ColumnType, Projection};

/// Identifies the type of database backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// MongoDB (document store).
    MongoDB,
    /// In-process document store.
    Memory,
    /// Custom or unknown backend.
    Custom(&'static str),
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::MongoDB => write!(f, "mongodb"),
            BackendKind::Memory => write!(f, "memory"),
            BackendKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A column of the relational table as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared column type.
    pub column_type: ColumnType,
}

impl ColumnInfo {
    /// Creates a column description.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// The relational side: one table whose columns only ever grow.
///
/// Implementations must make [`add_column`](Self::add_column) additive; a
/// column is never dropped or retyped.
#[async_trait]
pub trait RelationalBackend: Send + Sync + Debug {
    /// Returns the backend type.
    fn kind(&self) -> BackendKind;

    /// Returns a short name for logging.
    fn name(&self) -> &'static str;

    /// Creates the table and bookkeeping structures if missing.
    async fn initialize(&self) -> BackendResult<()>;

    /// Lists the current columns of the table, in table order.
    async fn columns(&self) -> BackendResult<Vec<ColumnInfo>>;

    /// Adds a nullable column.
    async fn add_column(&self, name: &str, column_type: ColumnType) -> BackendResult<()>;

    /// Creates a unique index over a single column.
    async fn create_unique_index(&self, column: &str) -> BackendResult<()>;

    /// Inserts one row. Keys must name existing columns.
    async fn insert_row(&self, row: &Projection) -> BackendResult<()>;

    /// Fetches the row with the given server ingestion timestamp.
    async fn fetch_row(&self, sys_ingested_at: &str) -> BackendResult<Option<Projection>>;

    /// Number of rows in the table.
    async fn count(&self) -> BackendResult<u64>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> BackendResult<()>;
}

/// The document side: one schema-less collection.
#[async_trait]
pub trait DocumentBackend: Send + Sync + Debug {
    /// Returns the backend type.
    fn kind(&self) -> BackendKind;

    /// Returns a short name for logging.
    fn name(&self) -> &'static str;

    /// Creates indexes on the join fields if missing.
    async fn initialize(&self) -> BackendResult<()>;

    /// Inserts one document.
    async fn insert_document(&self, document: &Projection) -> BackendResult<()>;

    /// Finds the document with the given server ingestion timestamp.
    async fn find_by_join_key(&self, sys_ingested_at: &str) -> BackendResult<Option<Value>>;

    /// Number of documents in the collection.
    async fn count(&self) -> BackendResult<u64>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> BackendResult<()>;
}
