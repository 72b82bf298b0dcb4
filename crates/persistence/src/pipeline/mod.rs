//! Record ingestion.
//!
//! [`IngestionPipeline`] ties the engine together. For every record it:
//!
//! 1. rejects anything that is not an object with a non-null `username`
//! 2. normalizes keys through the learned rule book
//! 3. stamps `sys_ingested_at` from a monotonic clock and fills `t_stamp`
//! 4. updates field statistics and re-decides each field's placement
//! 5. hands the routed record to the [`DualWriter`](crate::writer::DualWriter)
//! 6. periodically persists the metadata store
//!
//! Query methods (`field_report`, `placement_summary`, `pipeline_stats`)
//! read the same state without blocking ingestion for long.

mod clock;
mod ingest;
mod report;
mod stats;

pub use clock::IngestClock;
pub use ingest::{BatchReport, IngestReport, IngestionPipeline};
pub use report::FieldReport;
pub use stats::PipelineStats;
