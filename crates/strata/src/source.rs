//! Newline-delimited JSON record source.

use serde::Serialize;
use strata_persistence::IngestionPipeline;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// Line counts for one input stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    /// Lines read, including blank ones.
    pub lines: u64,
    /// Blank lines skipped.
    pub blank: u64,
    /// Records accepted by the pipeline.
    pub accepted: u64,
    /// Undecodable or rejected records.
    pub malformed: u64,
    /// Records that failed for any other reason.
    pub failed: u64,
}

/// Feeds every line of `reader` to the pipeline.
///
/// Only I/O errors on the stream itself end ingestion early.
pub async fn ingest_ndjson<R>(pipeline: &IngestionPipeline, reader: R) -> std::io::Result<SourceReport>
where
    R: AsyncBufRead + Unpin,
{
    let mut report = SourceReport::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        report.lines += 1;
        match pipeline.ingest_line(report.lines, &line).await {
            Ok(Some(_)) => report.accepted += 1,
            Ok(None) => report.blank += 1,
            Err(e) if e.is_malformed_input() => {
                debug!(line = report.lines, error = %e, "Skipped malformed record");
                report.malformed += 1;
            }
            Err(e) => {
                warn!(line = report.lines, error = %e, "Record failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
