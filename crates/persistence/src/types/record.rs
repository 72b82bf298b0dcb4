//! Record-level types: mandatory join fields, projections and joined views.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The record identity field. Every accepted record carries it.
pub const IDENTITY_FIELD: &str = "username";

/// The client-supplied timestamp.
pub const CLIENT_TIMESTAMP_FIELD: &str = "t_stamp";

/// The server-assigned ingestion timestamp; the join key between backends.
pub const SERVER_TIMESTAMP_FIELD: &str = "sys_ingested_at";

/// Fields that are always written to both backends.
pub const MANDATORY_FIELDS: [&str; 3] =
    [IDENTITY_FIELD, SERVER_TIMESTAMP_FIELD, CLIENT_TIMESTAMP_FIELD];

/// Returns true if `name` is a mandatory join field.
pub fn is_mandatory(name: &str) -> bool {
    MANDATORY_FIELDS.contains(&name)
}

/// A JSON object keyed by canonical field names.
pub type Projection = Map<String, Value>;

/// A normalized record split into its two backend projections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// Fields bound for the relational table.
    pub relational: Projection,
    /// Fields bound for the document collection.
    pub document: Projection,
}

impl SplitRecord {
    /// Returns the join key shared by both projections.
    pub fn join_key(&self) -> Option<&str> {
        self.relational
            .get(SERVER_TIMESTAMP_FIELD)
            .or_else(|| self.document.get(SERVER_TIMESTAMP_FIELD))
            .and_then(Value::as_str)
    }
}

/// Both backend views of one logical record, fetched by join key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    /// The server ingestion timestamp used for the lookup.
    pub sys_ingested_at: String,
    /// The relational row, if one was written.
    pub relational: Option<Projection>,
    /// The document, if one was written.
    pub document: Option<Value>,
}

impl JoinedRecord {
    /// Returns true if neither backend holds the record.
    pub fn is_empty(&self) -> bool {
        self.relational.is_none() && self.document.is_none()
    }

    /// Merges both views into one object. Document fields win on conflict
    /// because they are stored without text encoding.
    pub fn merged(&self) -> Projection {
        let mut merged = self.relational.clone().unwrap_or_default();
        if let Some(Value::Object(doc)) = &self.document {
            for (k, v) in doc {
                merged.insert(k.clone(), v.clone());
            }
        }
        merged
    }
}
