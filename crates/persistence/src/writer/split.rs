//! Splitting a routed record into its two backend projections.

use serde::Serialize;
use serde_json::Value;

use crate::types::{
    ColumnType, Placement, SERVER_TIMESTAMP_FIELD, SemanticType, SplitRecord, is_mandatory,
};

/// One normalized field of a record together with its routing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutedField {
    /// Canonical field name.
    pub name: String,
    /// The raw value.
    pub value: Value,
    /// Semantic type of this value.
    pub semantic: SemanticType,
    /// Current placement of the field.
    pub placement: Placement,
    /// Column type used if a relational column has to be created.
    pub column_type: ColumnType,
    /// Whether a new column should get a unique index.
    pub unique: bool,
}

/// A normalized record whose fields carry their placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutedRecord {
    /// Fields in record order.
    pub fields: Vec<RoutedField>,
}

impl RoutedRecord {
    /// Returns the server ingestion timestamp.
    pub fn join_key(&self) -> Option<&str> {
        self.field(SERVER_TIMESTAMP_FIELD)
            .and_then(|f| f.value.as_str())
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&RoutedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Splits a record into its relational and document projections.
///
/// Mandatory join fields go to both sides. When the document side is not
/// available, document-bound fields are folded into the relational
/// projection. Nested values on the relational side are JSON-encoded text.
pub fn split_record(record: &RoutedRecord, document_available: bool) -> SplitRecord {
    let mut split = SplitRecord::default();

    for field in &record.fields {
        let placement = if is_mandatory(&field.name) {
            Placement::Both
        } else {
            field.placement
        };

        let to_relational = placement.is_relational() || !document_available;
        let to_document = placement.is_document() && document_available;

        if to_relational {
            split
                .relational
                .insert(field.name.clone(), relational_value(&field.value));
        }
        if to_document {
            split.document.insert(field.name.clone(), field.value.clone());
        }
    }

    split
}

fn relational_value(value: &Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}
