//! Cumulative per-field statistics and normalization rules.
//!
//! The [`MetadataStore`] is the single owner of everything the engine has
//! learned: per-field [`FieldStatistics`], the raw → canonical
//! normalization rules and the accepted-record counter. It is loaded once at
//! start and saved as a single JSON document:
//!
//! ```json
//! {
//!   "version": 1,
//!   "fields": { "email": { "appearances": 95, "type_counts": { "email": 95 }, ... } },
//!   "normalization_rules": { "emailAddress": "email" },
//!   "total_records_seen": 100
//! }
//! ```

mod stats;
mod store;

pub use stats::{FieldSnapshot, FieldStatistics, SAMPLE_VALUE_MAX_CHARS};
pub use store::{DEFAULT_SAMPLE_CAPACITY, METADATA_FORMAT_VERSION, MetadataStore, MetadataSummary};
