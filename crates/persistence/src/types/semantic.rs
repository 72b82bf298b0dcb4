//! Semantic value types and their relational column mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The semantic type of a single raw value.
///
/// This goes beyond the JSON value kinds: strings are further classified into
/// identifiers, addresses and timestamps so that `"1.2.3.4"` and `1.2` end up
/// in different buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Absent or JSON `null`.
    Null,
    /// `true` / `false`.
    Boolean,
    /// Integer-valued number.
    Integer,
    /// Non-integer number.
    Float,
    /// JSON array.
    List,
    /// JSON object.
    Dict,
    /// Canonical `8-4-4-4-12` hex UUID string.
    Uuid,
    /// Dotted-quad IPv4 address string.
    IpAddress,
    /// E-mail address string.
    Email,
    /// `http://` or `https://` URL string.
    Url,
    /// ISO-8601 date-time string.
    Timestamp,
    /// Any other string.
    String,
}

impl SemanticType {
    /// All semantic types, in cascade order.
    pub const ALL: [SemanticType; 12] = [
        SemanticType::Null,
        SemanticType::Boolean,
        SemanticType::Integer,
        SemanticType::Float,
        SemanticType::List,
        SemanticType::Dict,
        SemanticType::Uuid,
        SemanticType::IpAddress,
        SemanticType::Email,
        SemanticType::Url,
        SemanticType::Timestamp,
        SemanticType::String,
    ];

    /// Returns the stable name used in persisted metadata and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Null => "null",
            SemanticType::Boolean => "boolean",
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::List => "list",
            SemanticType::Dict => "dict",
            SemanticType::Uuid => "uuid",
            SemanticType::IpAddress => "ip_address",
            SemanticType::Email => "email",
            SemanticType::Url => "url",
            SemanticType::Timestamp => "timestamp",
            SemanticType::String => "string",
        }
    }

    /// Returns true for array and object values.
    pub fn is_nested(&self) -> bool {
        matches!(self, SemanticType::List | SemanticType::Dict)
    }

    /// Returns the relational column type used when a column is first created
    /// for a field of this type.
    pub fn column_type(&self) -> ColumnType {
        match self {
            SemanticType::Boolean => ColumnType::Boolean,
            SemanticType::Integer => ColumnType::Integer,
            SemanticType::Float => ColumnType::Real,
            SemanticType::IpAddress => ColumnType::Varchar(15),
            SemanticType::Uuid => ColumnType::Varchar(36),
            SemanticType::Timestamp => ColumnType::Timestamp,
            SemanticType::Email
            | SemanticType::Url
            | SemanticType::String
            | SemanticType::Null
            | SemanticType::List
            | SemanticType::Dict => ColumnType::Text,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relational column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// `BOOLEAN`
    Boolean,
    /// `INTEGER`
    Integer,
    /// `REAL`
    Real,
    /// `VARCHAR(n)`
    Varchar(u16),
    /// `TIMESTAMP`
    Timestamp,
    /// `TEXT`, the maximally permissive type.
    Text,
}

impl ColumnType {
    /// Returns the SQL type name used in DDL.
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Real => "REAL".to_string(),
            ColumnType::Varchar(len) => format!("VARCHAR({})", len),
            ColumnType::Timestamp => "TIMESTAMP".to_string(),
            ColumnType::Text => "TEXT".to_string(),
        }
    }

    /// Parses a declared SQL type back into a column type.
    ///
    /// Unknown declarations are treated as text.
    pub fn from_sql(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();
        if let Some(len) = upper
            .strip_prefix("VARCHAR(")
            .and_then(|rest| rest.strip_suffix(')'))
            .and_then(|n| n.trim().parse::<u16>().ok())
        {
            return ColumnType::Varchar(len);
        }
        match upper.as_str() {
            "BOOLEAN" => ColumnType::Boolean,
            "INTEGER" => ColumnType::Integer,
            "REAL" => ColumnType::Real,
            "TIMESTAMP" => ColumnType::Timestamp,
            _ => ColumnType::Text,
        }
    }

    /// Returns true if a value of the given semantic type can be stored in
    /// this column without widening.
    ///
    /// `null` conforms to every column.
    pub fn accepts(&self, semantic: SemanticType) -> bool {
        if semantic == SemanticType::Null {
            return true;
        }
        match self {
            ColumnType::Text => true,
            ColumnType::Boolean => semantic == SemanticType::Boolean,
            ColumnType::Integer => semantic == SemanticType::Integer,
            ColumnType::Real => matches!(semantic, SemanticType::Float | SemanticType::Integer),
            ColumnType::Timestamp => semantic == SemanticType::Timestamp,
            ColumnType::Varchar(len) => {
                semantic.column_type() == ColumnType::Varchar(*len)
            }
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}
