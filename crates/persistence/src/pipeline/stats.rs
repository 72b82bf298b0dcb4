//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::writer::WriteOutcome;

/// Live counters, updated without locking.
#[derive(Debug, Default)]
pub(crate) struct PipelineCounters {
    total_processed: AtomicU64,
    accepted: AtomicU64,
    malformed: AtomicU64,
    relational_inserts: AtomicU64,
    relational_failures: AtomicU64,
    document_inserts: AtomicU64,
    document_failures: AtomicU64,
    degraded_records: AtomicU64,
    columns_added: AtomicU64,
    placement_changes: AtomicU64,
    metadata_saves: AtomicU64,
    metadata_save_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PipelineCounters {
    pub(crate) fn processed(&self) {
        bump(&self.total_processed);
    }

    pub(crate) fn malformed(&self) {
        bump(&self.malformed);
    }

    pub(crate) fn placement_changed(&self) {
        bump(&self.placement_changes);
    }

    pub(crate) fn metadata_saved(&self, ok: bool) {
        if ok {
            bump(&self.metadata_saves);
        } else {
            bump(&self.metadata_save_failures);
        }
    }

    pub(crate) fn written(&self, outcome: &WriteOutcome) {
        bump(&self.accepted);
        if outcome.relational.is_written() {
            bump(&self.relational_inserts);
        } else if outcome.relational.is_failed() {
            bump(&self.relational_failures);
        }
        if outcome.document.is_written() {
            bump(&self.document_inserts);
        } else if outcome.document.is_failed() {
            bump(&self.document_failures);
        }
        if outcome.degraded {
            bump(&self.degraded_records);
        }
        self.columns_added
            .fetch_add(outcome.columns_added.len() as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PipelineStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        PipelineStats {
            total_processed: get(&self.total_processed),
            accepted: get(&self.accepted),
            malformed: get(&self.malformed),
            relational_inserts: get(&self.relational_inserts),
            relational_failures: get(&self.relational_failures),
            document_inserts: get(&self.document_inserts),
            document_failures: get(&self.document_failures),
            degraded_records: get(&self.degraded_records),
            columns_added: get(&self.columns_added),
            placement_changes: get(&self.placement_changes),
            metadata_saves: get(&self.metadata_saves),
            metadata_save_failures: get(&self.metadata_save_failures),
        }
    }
}

/// A point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Records handed to the pipeline, including rejected ones.
    pub total_processed: u64,
    /// Records that passed validation and were routed.
    pub accepted: u64,
    /// Records rejected as malformed.
    pub malformed: u64,
    /// Successful relational inserts.
    pub relational_inserts: u64,
    /// Failed relational inserts.
    pub relational_failures: u64,
    /// Successful document inserts.
    pub document_inserts: u64,
    /// Failed document inserts.
    pub document_failures: u64,
    /// Records written relational-only.
    pub degraded_records: u64,
    /// Columns added by schema evolution.
    pub columns_added: u64,
    /// Fields whose placement changed.
    pub placement_changes: u64,
    /// Successful metadata saves.
    pub metadata_saves: u64,
    /// Failed metadata saves.
    pub metadata_save_failures: u64,
}

impl PipelineStats {
    /// Total failed backend writes.
    pub fn errors(&self) -> u64 {
        self.relational_failures + self.document_failures
    }
}
