//! Field placement decisions.
//!
//! Every time a field is observed or queried, the [`PlacementEngine`]
//! re-evaluates the decision tree below against the field's current
//! statistics. The first matching row wins.
//!
//! | # | Condition | Placement | Reason |
//! |---|-----------|-----------|--------|
//! | 1 | Mandatory join field | both | mandatory join field |
//! | 2 | Dominant type is list or dict | document | nested/array value |
//! | 3 | appearances < `min_observations` | document | insufficient observations |
//! | 4 | frequency ≥ F and stability ≥ S | relational | high frequency and stable type |
//! | 5 | frequency < F | document | low frequency |
//! | 6 | otherwise | document | type drifting |
//!
//! A field that flips from relational to document keeps its relational
//! column; earlier rows are not migrated.

mod engine;
mod unique;

pub use engine::{PlacementEngine, PlacementSummary};
pub use unique::{is_unique, should_index};
