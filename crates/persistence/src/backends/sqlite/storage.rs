//! [`RelationalBackend`] implementation for SQLite.

use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{ErrorCode, params_from_iter};
use serde_json::{Number, Value};
use tracing::{debug, info};

use crate::core::{BackendKind, ColumnInfo, RelationalBackend};
use crate::error::{BackendError, BackendResult};
use crate::types::{ColumnType, Projection, SERVER_TIMESTAMP_FIELD};

use super::SqliteBackend;
use super::backend::internal_error;
use super::schema::{RECORDS_TABLE, ROW_ID_COLUMN, quote_ident, unique_index_name};

impl SqliteBackend {
    fn table_columns(&self) -> BackendResult<Vec<ColumnInfo>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", RECORDS_TABLE))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get(2)?;
                Ok(ColumnInfo::new(name, ColumnType::from_sql(&declared)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

#[async_trait]
impl RelationalBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn initialize(&self) -> BackendResult<()> {
        self.init_schema()
    }

    async fn columns(&self) -> BackendResult<Vec<ColumnInfo>> {
        self.table_columns()
    }

    async fn add_column(&self, name: &str, column_type: ColumnType) -> BackendResult<()> {
        let conn = self.get_connection()?;
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            RECORDS_TABLE,
            quote_ident(name),
            column_type.sql()
        );
        match conn.execute(&sql, []) {
            Ok(_) => {
                info!(column = %name, column_type = %column_type, "Added column");
                Ok(())
            }
            Err(e) if e.to_string().contains("duplicate column name") => {
                debug!(column = %name, "Column already present");
                Ok(())
            }
            Err(e) => Err(BackendError::SchemaEvolution {
                column: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn create_unique_index(&self, column: &str) -> BackendResult<()> {
        let conn = self.get_connection()?;
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&unique_index_name(column)),
            RECORDS_TABLE,
            quote_ident(column)
        );
        conn.execute(&sql, []).map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                BackendError::SchemaEvolution {
                    column: column.to_string(),
                    message: format!("existing rows are not unique: {}", e),
                }
            }
            _ => internal_error(format!("Failed to create unique index on {}: {}", column, e)),
        })?;
        info!(column = %column, "Created unique index");
        Ok(())
    }

    async fn insert_row(&self, row: &Projection) -> BackendResult<()> {
        if row.is_empty() {
            return Err(BackendError::WriteRejected {
                backend_name: "sqlite".to_string(),
                message: "empty row".to_string(),
            });
        }

        let columns: Vec<String> = row.keys().map(|k| quote_ident(k)).collect();
        let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            RECORDS_TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );

        let column_types: HashMap<String, ColumnType> = self
            .table_columns()?
            .into_iter()
            .map(|c| (c.name, c.column_type))
            .collect();
        let values: Vec<SqlValue> = row
            .iter()
            .map(|(name, value)| {
                let column_type = column_types.get(name).copied().unwrap_or(ColumnType::Text);
                bind_value(value, column_type)
            })
            .collect();
        let conn = self.get_connection()?;
        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    async fn fetch_row(&self, sys_ingested_at: &str) -> BackendResult<Option<Projection>> {
        let columns = self.table_columns()?;
        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1",
            RECORDS_TABLE, SERVER_TIMESTAMP_FIELD
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([sys_ingested_at])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let mut projection = Projection::new();
        for (i, column) in columns.iter().enumerate() {
            if column.name == ROW_ID_COLUMN {
                continue;
            }
            let value = from_sql_value(row.get_ref(i)?, column.column_type);
            if !value.is_null() {
                projection.insert(column.name.clone(), value);
            }
        }
        Ok(Some(projection))
    }

    async fn count(&self) -> BackendResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", RECORDS_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> BackendResult<()> {
        let conn = self
            .get_connection()
            .map_err(|_| BackendError::Unavailable {
                backend_name: "sqlite".to_string(),
                message: "Failed to get connection".to_string(),
            })?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| internal_error(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// Converts a JSON value into an SQLite value. Nested values become JSON text.
fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Integer(i),
            // u64 beyond i64::MAX: keep every digit.
            (None, _) if n.is_u64() => SqlValue::Text(n.to_string()),
            (None, Some(f)) => SqlValue::Real(f),
            (None, None) => SqlValue::Text(n.to_string()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Returns true if SQLite converts numeric-looking text stored in the column.
fn numeric_affinity(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::Boolean | ColumnType::Integer | ColumnType::Real | ColumnType::Timestamp
    )
}

fn looks_numeric(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.parse::<f64>().is_ok()
}

/// Converts a value for a column of the given type.
///
/// Text that the column's affinity would turn into a number is bound as a
/// blob, which SQLite stores untouched.
fn bind_value(value: &Value, column_type: ColumnType) -> SqlValue {
    match to_sql_value(value) {
        SqlValue::Text(text) if numeric_affinity(column_type) && looks_numeric(&text) => {
            SqlValue::Blob(text.into_bytes())
        }
        other => other,
    }
}

/// Converts an SQLite value back into JSON by its storage class. Integers in
/// boolean columns are booleans; text and blobs are strings.
fn from_sql_value(value: ValueRef<'_>, column_type: ColumnType) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) if column_type == ColumnType::Boolean => Value::Bool(i != 0),
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
