//! Uniqueness and indexing heuristics.

use crate::metadata::{FieldSnapshot, FieldStatistics};
use crate::types::{IDENTITY_FIELD, SERVER_TIMESTAMP_FIELD, SemanticType};

/// Name tokens that mark a field as a potential identifier.
const IDENTIFIER_TOKENS: [&str; 4] = ["id", "uuid", "key", "session"];

/// Sampled distinct-value ratio above which a field looks unique.
const DISTINCT_RATIO_THRESHOLD: f64 = 0.9;

/// Frequency at or above which a field is worth indexing.
const INDEX_FREQUENCY_THRESHOLD: f64 = 50.0;

/// Fields that are likely to appear in lookups.
const QUERY_FIELDS: [&str; 7] = [
    "username",
    "timestamp",
    "t_stamp",
    "sys_ingested_at",
    "session_id",
    "device_id",
    "user_id",
];

/// Returns true if the field should carry a unique constraint.
///
/// The name must contain an identifier token (`id`, `uuid`, `key` or
/// `session` as a whole `_`-separated part) and the values must look unique:
/// either a dominant `uuid` type or more than 90% distinct sampled values.
/// The identity field is never unique; the server ingestion timestamp always
/// is.
pub fn is_unique(name: &str, stats: &FieldStatistics) -> bool {
    if name == SERVER_TIMESTAMP_FIELD {
        return true;
    }
    if name == IDENTITY_FIELD {
        return false;
    }
    let has_identifier_token = name
        .split('_')
        .any(|token| IDENTIFIER_TOKENS.contains(&token));
    if !has_identifier_token {
        return false;
    }
    stats.dominant_type() == SemanticType::Uuid
        || stats
            .distinct_ratio()
            .is_some_and(|ratio| ratio > DISTINCT_RATIO_THRESHOLD)
}

/// Returns true if the field is worth a secondary index.
pub fn should_index(field: &FieldSnapshot) -> bool {
    QUERY_FIELDS.contains(&field.name.as_str()) || field.frequency() >= INDEX_FREQUENCY_THRESHOLD
}
