//! In-memory mirror of the relational table's columns.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::ColumnInfo;
use crate::types::{ColumnType, SemanticType};

/// One known column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnState {
    /// Type the column was created with.
    pub column_type: ColumnType,
    /// Set once a non-conforming value has been seen; from then on such
    /// values are stored as text.
    pub permissive: bool,
}

/// Known columns of the relational table.
///
/// Seeded once from the backend; afterwards the writer keeps it in step with
/// every column it adds.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: BTreeMap<String, ColumnState>,
}

impl ColumnRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from the columns reported by a backend.
    pub fn from_columns(columns: impl IntoIterator<Item = ColumnInfo>) -> Self {
        let columns = columns
            .into_iter()
            .map(|c| {
                (
                    c.name,
                    ColumnState {
                        column_type: c.column_type,
                        permissive: c.column_type == ColumnType::Text,
                    },
                )
            })
            .collect();
        Self { columns }
    }

    /// Returns true if the column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Returns the state of a column.
    pub fn get(&self, name: &str) -> Option<ColumnState> {
        self.columns.get(name).copied()
    }

    /// Registers a newly added column.
    pub fn insert(&mut self, name: impl Into<String>, column_type: ColumnType) {
        self.columns.insert(
            name.into(),
            ColumnState {
                column_type,
                permissive: column_type == ColumnType::Text,
            },
        );
    }

    /// Checks a value type against a column. Returns true if the value must
    /// be written as text, marking the column permissive on first conflict.
    ///
    /// Unknown columns never need text encoding.
    pub fn needs_text(&mut self, name: &str, semantic: SemanticType) -> bool {
        let Some(state) = self.columns.get_mut(name) else {
            return false;
        };
        if state.column_type.accepts(semantic) {
            return false;
        }
        if !state.permissive {
            state.permissive = true;
            tracing::info!(
                column = %name,
                column_type = %state.column_type,
                value_type = %semantic,
                "Column marked permissive after conflicting value"
            );
        }
        true
    }

    /// Number of known columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no columns are known.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over columns in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnState)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}
