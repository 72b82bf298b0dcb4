//! Dual-backend writing and schema evolution.
//!
//! For each record the writer:
//!
//! 1. decides whether the document side is available (configured and
//!    healthy, with periodic probes while unhealthy);
//! 2. splits the record into relational and document projections, folding
//!    document fields into the relational side when it is not;
//! 3. adds a typed column for every relational field the table does not have
//!    yet, plus a unique index if the field looks like an identifier;
//! 4. text-encodes values that do not fit their column;
//! 5. inserts the row and the document, each with retry.
//!
//! Columns are only ever added. A column whose field later drifts or moves
//! to the document side stays, and accepts text from then on.

mod dual;
mod registry;
mod retry;
mod split;

pub use dual::{DualWriter, WriteOutcome, WriteStatus};
pub use registry::{ColumnRegistry, ColumnState};
pub use split::{RoutedField, RoutedRecord, split_record};
