//! The ingestion pipeline.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::classify::{FieldNormalizer, TypeDetector};
use crate::config::PipelineConfig;
use crate::error::{IngestError, MetadataError, StorageResult};
use crate::metadata::{MetadataStore, MetadataSummary};
use crate::placement::{PlacementEngine, PlacementSummary};
use crate::types::{
    CLIENT_TIMESTAMP_FIELD, IDENTITY_FIELD, JoinedRecord, SERVER_TIMESTAMP_FIELD,
};
use crate::writer::{DualWriter, RoutedField, RoutedRecord, WriteOutcome};

use super::clock::IngestClock;
use super::report::FieldReport;
use super::stats::{PipelineCounters, PipelineStats};

/// Fallback source for a missing client timestamp.
const FALLBACK_TIMESTAMP_FIELD: &str = "timestamp";

/// Result of ingesting one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Join key assigned to the record.
    pub sys_ingested_at: String,
    /// What each backend did with it.
    pub outcome: WriteOutcome,
}

/// Totals for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Records in the batch.
    pub received: u64,
    /// Records routed to the backends.
    pub accepted: u64,
    /// Records rejected as malformed.
    pub malformed: u64,
    /// Accepted records with at least one failed backend write.
    pub write_failures: u64,
    /// Accepted records written relational-only.
    pub degraded: u64,
}

/// Normalizes, classifies, places and writes records.
///
/// One pipeline is shared by every producer; all methods take `&self`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use serde_json::json;
/// use strata_persistence::backends::memory::MemoryDocumentStore;
/// use strata_persistence::backends::sqlite::SqliteBackend;
/// use strata_persistence::config::PipelineConfig;
/// use strata_persistence::metadata::MetadataStore;
/// use strata_persistence::pipeline::IngestionPipeline;
/// use strata_persistence::writer::DualWriter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::default();
/// let writer = DualWriter::connect(
///     Arc::new(SqliteBackend::open("records.db")?),
///     Some(Arc::new(MemoryDocumentStore::new())),
///     config.retry.clone(),
///     config.health.clone(),
/// )
/// .await?;
/// let metadata = MetadataStore::load("metadata.json").await?;
/// let pipeline = IngestionPipeline::new(config, metadata, writer)?;
///
/// let report = pipeline
///     .ingest_record(json!({"userName": "alice", "battery": 80}))
///     .await?;
/// println!("stored as {}", report.sys_ingested_at);
/// pipeline.persist().await?;
/// # Ok(())
/// # }
/// ```
pub struct IngestionPipeline {
    config: PipelineConfig,
    normalizer: FieldNormalizer,
    detector: TypeDetector,
    engine: PlacementEngine,
    metadata: Arc<MetadataStore>,
    writer: DualWriter,
    clock: IngestClock,
    counters: PipelineCounters,
    accepted_since_persist: AtomicU64,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("config", &self.config)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl IngestionPipeline {
    /// Creates a pipeline with the built-in normalization rules.
    pub fn new(
        config: PipelineConfig,
        metadata: MetadataStore,
        writer: DualWriter,
    ) -> StorageResult<Self> {
        Self::with_normalizer(config, metadata, writer, FieldNormalizer::new()?)
    }

    /// Creates a pipeline with a custom normalizer.
    pub fn with_normalizer(
        config: PipelineConfig,
        metadata: MetadataStore,
        writer: DualWriter,
        normalizer: FieldNormalizer,
    ) -> StorageResult<Self> {
        config.ensure_valid()?;
        let engine = PlacementEngine::new(config.thresholds)?;
        let metadata = metadata.with_sample_capacity(config.sample_capacity);

        info!(
            records_seen = metadata.total_records_seen(),
            fields = metadata.summary().field_count,
            document_available = writer.document_available(),
            "Ingestion pipeline ready"
        );

        Ok(Self {
            config,
            normalizer,
            detector: TypeDetector::new(),
            engine,
            metadata: Arc::new(metadata),
            writer,
            clock: IngestClock::new(),
            counters: PipelineCounters::default(),
            accepted_since_persist: AtomicU64::new(0),
        })
    }

    /// The metadata store.
    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    /// The writer.
    pub fn writer(&self) -> &DualWriter {
        &self.writer
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingests one record.
    ///
    /// Malformed input (not an object, or no identity) is rejected with an
    /// [`IngestError`] and leaves statistics untouched. Backend failures do
    /// not fail the call; they are reported in the returned outcome.
    #[instrument(skip_all)]
    pub async fn ingest_record(&self, raw: Value) -> StorageResult<IngestReport> {
        self.counters.processed();

        let mut record = match self.normalize(raw) {
            Ok(record) => record,
            Err(e) => {
                self.counters.malformed();
                debug!(error = %e, "Rejected record");
                return Err(e.into());
            }
        };

        let ingested_at = self.clock.next();
        let join_key = IngestClock::format(&ingested_at);
        if let Some(client_value) =
            record.insert(SERVER_TIMESTAMP_FIELD.to_string(), Value::String(join_key.clone()))
        {
            debug!(client_value = %client_value, "Replaced client-supplied {}", SERVER_TIMESTAMP_FIELD);
        }
        if record.get(CLIENT_TIMESTAMP_FIELD).is_none_or(Value::is_null) {
            let fallback = record
                .get(FALLBACK_TIMESTAMP_FIELD)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| Value::String(join_key.clone()));
            record.insert(CLIENT_TIMESTAMP_FIELD.to_string(), fallback);
        }

        self.metadata.record_seen();
        let mut routed = RoutedRecord::default();
        for (name, value) in record {
            routed.fields.push(self.route_field(name, value, ingested_at));
        }

        let outcome = self.writer.write(&routed).await;
        self.counters.written(&outcome);
        self.maybe_persist().await;

        Ok(IngestReport {
            sys_ingested_at: join_key,
            outcome,
        })
    }

    /// Ingests records in order, then persists metadata.
    ///
    /// Individual failures are counted, not returned.
    pub async fn ingest_batch(&self, records: impl IntoIterator<Item = Value>) -> BatchReport {
        let mut batch = BatchReport::default();
        for raw in records {
            batch.received += 1;
            match self.ingest_record(raw).await {
                Ok(report) => {
                    batch.accepted += 1;
                    let outcome = &report.outcome;
                    if outcome.relational.is_failed() || outcome.document.is_failed() {
                        batch.write_failures += 1;
                    }
                    if outcome.degraded {
                        batch.degraded += 1;
                    }
                }
                Err(e) if e.is_malformed_input() => batch.malformed += 1,
                Err(e) => {
                    warn!(error = %e, "Record failed");
                    batch.write_failures += 1;
                }
            }
        }

        // Already logged and counted.
        let _ = self.persist().await;

        info!(
            received = batch.received,
            accepted = batch.accepted,
            malformed = batch.malformed,
            write_failures = batch.write_failures,
            degraded = batch.degraded,
            "Batch ingested"
        );
        batch
    }

    /// Decodes and ingests one line of newline-delimited JSON.
    ///
    /// Blank lines are skipped and return `Ok(None)`. Lines that do not
    /// decode are rejected as malformed.
    pub async fn ingest_line(&self, line_number: u64, line: &str) -> StorageResult<Option<IngestReport>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Value>(line) {
            Ok(raw) => self.ingest_record(raw).await.map(Some),
            Err(e) => {
                self.counters.processed();
                self.counters.malformed();
                warn!(line = line_number, error = %e, "Undecodable record");
                Err(IngestError::Undecodable {
                    line: line_number,
                    message: e.to_string(),
                }
                .into())
            }
        }
    }

    /// Saves the metadata store if it has a durable location.
    pub async fn persist(&self) -> Result<(), MetadataError> {
        if self.metadata.path().is_none() {
            return Ok(());
        }
        match self.metadata.save().await {
            Ok(()) => {
                self.counters.metadata_saved(true);
                Ok(())
            }
            Err(e) => {
                self.counters.metadata_saved(false);
                warn!(error = %e, "Failed to persist metadata");
                Err(e)
            }
        }
    }

    /// Current report for every known field, ordered by name.
    pub fn field_report(&self) -> Vec<FieldReport> {
        self.metadata
            .snapshot()
            .iter()
            .map(|snapshot| FieldReport::from_snapshot(snapshot, &self.engine))
            .collect()
    }

    /// Current report for one field.
    pub fn field(&self, name: &str) -> Option<FieldReport> {
        self.metadata
            .field(name)
            .map(|snapshot| FieldReport::from_snapshot(&snapshot, &self.engine))
    }

    /// Fields grouped by placement.
    pub fn placement_summary(&self) -> PlacementSummary {
        self.engine.summary(&self.metadata.snapshot())
    }

    /// Aggregate metadata counts.
    pub fn metadata_summary(&self) -> MetadataSummary {
        self.metadata.summary()
    }

    /// Pipeline counters.
    pub fn pipeline_stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Fetches both projections of a record by its join key.
    pub async fn fetch_joined(&self, sys_ingested_at: &str) -> StorageResult<JoinedRecord> {
        Ok(self.writer.fetch_joined(sys_ingested_at).await?)
    }

    /// Validates the record and normalizes its keys. The first raw key that
    /// maps to a canonical name wins.
    fn normalize(&self, raw: Value) -> Result<Map<String, Value>, IngestError> {
        let object = match raw {
            Value::Object(object) => object,
            other => {
                return Err(IngestError::NotAnObject {
                    found: json_kind(&other).to_string(),
                });
            }
        };

        let mut seen = HashSet::new();
        let mut record = Map::new();
        for (raw_key, value) in object {
            let canonical = self.normalizer.normalize(&raw_key, self.metadata.as_ref());
            if !seen.insert(canonical.clone()) {
                debug!(raw = %raw_key, canonical = %canonical, "Dropped duplicate field");
                continue;
            }
            record.insert(canonical, value);
        }

        if record.get(IDENTITY_FIELD).is_none_or(Value::is_null) {
            return Err(IngestError::MissingIdentity {
                field: IDENTITY_FIELD.to_string(),
            });
        }
        Ok(record)
    }

    /// Observes one field, re-decides its placement and logs changes.
    fn route_field(
        &self,
        name: String,
        value: Value,
        seen_at: chrono::DateTime<chrono::Utc>,
    ) -> RoutedField {
        let semantic = self.detector.detect(&value);
        let snapshot = self.metadata.observe(&name, semantic, &value, seen_at);
        let decision = self.engine.decide(&snapshot);

        if let Some(previous) = self.metadata.set_placement(&name, decision) {
            if previous.placement != decision.placement {
                self.counters.placement_changed();
                info!(
                    field = %name,
                    from = %previous.placement,
                    to = %decision.placement,
                    reason = %decision.reason,
                    frequency = snapshot.frequency(),
                    type_stability = snapshot.type_stability(),
                    "Placement changed"
                );
            }
        }

        RoutedField {
            column_type: snapshot.dominant_type().column_type(),
            unique: snapshot.stats.is_unique,
            placement: decision.placement,
            semantic,
            value,
            name,
        }
    }

    async fn maybe_persist(&self) {
        let every = self.config.persist_every;
        if every == 0 {
            return;
        }
        let n = self.accepted_since_persist.fetch_add(1, Ordering::Relaxed) + 1;
        if n % every == 0 {
            // Already logged and counted.
            let _ = self.persist().await;
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryDocumentStore;
    use crate::config::HealthConfig;
    use crate::core::{BackendKind, ColumnInfo, DocumentBackend, RelationalBackend};
    use crate::error::{BackendResult, StorageError};
    use crate::types::{ColumnType, Placement, PlacementReason, Projection, SemanticType};
    use async_trait::async_trait;
    use serde_json::json;

    /// Relational stand-in that accepts everything and stores nothing.
    #[derive(Debug, Default)]
    struct NullRelational;

    #[async_trait]
    impl RelationalBackend for NullRelational {
        fn kind(&self) -> BackendKind {
            BackendKind::Custom("null")
        }

        fn name(&self) -> &'static str {
            "null"
        }

        async fn initialize(&self) -> BackendResult<()> {
            Ok(())
        }

        async fn columns(&self) -> BackendResult<Vec<ColumnInfo>> {
            Ok(Vec::new())
        }

        async fn add_column(&self, _name: &str, _column_type: ColumnType) -> BackendResult<()> {
            Ok(())
        }

        async fn create_unique_index(&self, _column: &str) -> BackendResult<()> {
            Ok(())
        }

        async fn insert_row(&self, _row: &Projection) -> BackendResult<()> {
            Ok(())
        }

        async fn fetch_row(&self, _sys_ingested_at: &str) -> BackendResult<Option<Projection>> {
            Ok(None)
        }

        async fn count(&self) -> BackendResult<u64> {
            Ok(0)
        }

        async fn health_check(&self) -> BackendResult<()> {
            Ok(())
        }
    }

    async fn pipeline() -> (IngestionPipeline, Arc<MemoryDocumentStore>) {
        let documents = Arc::new(MemoryDocumentStore::new());
        let config = PipelineConfig::for_testing();
        let writer = DualWriter::connect(
            Arc::new(NullRelational),
            Some(documents.clone() as Arc<dyn DocumentBackend>),
            config.retry.clone(),
            HealthConfig::default(),
        )
        .await
        .unwrap();
        let pipeline = IngestionPipeline::new(config, MetadataStore::in_memory(), writer).unwrap();
        (pipeline, documents)
    }

    #[tokio::test]
    async fn test_rejects_non_object() {
        let (pipeline, _) = pipeline().await;
        let err = pipeline.ingest_record(json!([1, 2])).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Ingest(IngestError::NotAnObject { ref found }) if found == "array"
        ));
        assert_eq!(pipeline.pipeline_stats().malformed, 1);
        assert_eq!(pipeline.metadata().total_records_seen(), 0);
    }

    #[tokio::test]
    async fn test_rejects_missing_or_null_identity() {
        let (pipeline, _) = pipeline().await;
        for raw in [json!({"battery": 1}), json!({"user_name": null})] {
            let err = pipeline.ingest_record(raw).await.unwrap_err();
            assert!(err.is_malformed_input());
        }
        let stats = pipeline.pipeline_stats();
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.accepted, 0);
        assert!(pipeline.field_report().is_empty());
    }

    #[tokio::test]
    async fn test_assigns_join_key_and_client_timestamp() {
        let (pipeline, documents) = pipeline().await;
        let report = pipeline
            .ingest_record(json!({"username": "a", "sys_ingested_at": "spoofed"}))
            .await
            .unwrap();
        assert_ne!(report.sys_ingested_at, "spoofed");
        assert!(report.sys_ingested_at.ends_with('Z'));

        let split = &report.outcome.split;
        assert_eq!(split.join_key(), Some(report.sys_ingested_at.as_str()));
        assert_eq!(
            split.relational[CLIENT_TIMESTAMP_FIELD],
            json!(report.sys_ingested_at)
        );
        assert_eq!(documents.documents().len(), 1);
    }

    #[tokio::test]
    async fn test_client_timestamp_falls_back_to_timestamp_field() {
        let (pipeline, _) = pipeline().await;
        let report = pipeline
            .ingest_record(json!({"username": "a", "timestamp": "2024-05-01T10:00:00Z"}))
            .await
            .unwrap();
        assert_eq!(
            report.outcome.split.relational[CLIENT_TIMESTAMP_FIELD],
            json!("2024-05-01T10:00:00Z")
        );

        let report = pipeline
            .ingest_record(json!({"username": "a", "t_stamp": "client", "timestamp": "other"}))
            .await
            .unwrap();
        assert_eq!(
            report.outcome.split.relational[CLIENT_TIMESTAMP_FIELD],
            json!("client")
        );
    }

    #[tokio::test]
    async fn test_first_raw_key_wins() {
        let (pipeline, _) = pipeline().await;
        let report = pipeline
            .ingest_record(json!({"userName": "first", "user_name": "second"}))
            .await
            .unwrap();
        assert_eq!(report.outcome.split.relational["username"], json!("first"));
    }

    #[tokio::test]
    async fn test_nested_fields_go_to_documents() {
        let (pipeline, _) = pipeline().await;
        let report = pipeline
            .ingest_record(json!({"username": "a", "tags": ["x", "y"]}))
            .await
            .unwrap();
        assert_eq!(report.outcome.split.document["tags"], json!(["x", "y"]));
        assert!(!report.outcome.split.relational.contains_key("tags"));

        let tags = pipeline.field("tags").unwrap();
        assert_eq!(tags.placement, Placement::Document);
        assert_eq!(tags.dominant_type, SemanticType::List);
    }

    #[tokio::test]
    async fn test_field_report_after_warmup() {
        let (pipeline, _) = pipeline().await;
        for i in 0..40 {
            let mut record = json!({"username": format!("user{}", i), "battery": i});
            if i % 4 == 0 {
                record["rare"] = json!("x");
            }
            pipeline.ingest_record(record).await.unwrap();
        }

        let battery = pipeline.field("battery").unwrap();
        assert_eq!(battery.frequency, 100.0);
        assert_eq!(battery.placement, Placement::Relational);

        let rare = pipeline.field("rare").unwrap();
        assert_eq!(rare.frequency, 25.0);
        assert_eq!(rare.placement, Placement::Document);
        assert_eq!(rare.reason, PlacementReason::LowFrequency);

        let username = pipeline.field("username").unwrap();
        assert_eq!(username.placement, Placement::Both);
        assert!(username.should_index);
        assert!(!username.is_unique);

        let summary = pipeline.placement_summary();
        assert!(summary.relational.contains(&"battery".to_string()));
        assert!(summary.both.contains(&"username".to_string()));
        assert_eq!(pipeline.pipeline_stats().placement_changes, 1);
    }

    #[tokio::test]
    async fn test_ingest_line() {
        let (pipeline, _) = pipeline().await;
        assert!(pipeline.ingest_line(1, "   ").await.unwrap().is_none());
        assert!(
            pipeline
                .ingest_line(2, r#"{"username": "a"}"#)
                .await
                .unwrap()
                .is_some()
        );
        let err = pipeline.ingest_line(3, "{not json").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Ingest(IngestError::Undecodable { line: 3, .. })
        ));
        let stats = pipeline.pipeline_stats();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.malformed, 1);
    }

    #[tokio::test]
    async fn test_batch_counts() {
        let (pipeline, _) = pipeline().await;
        let batch = pipeline
            .ingest_batch(vec![
                json!({"username": "a"}),
                json!("nope"),
                json!({"username": "b"}),
            ])
            .await;
        assert_eq!(batch.received, 3);
        assert_eq!(batch.accepted, 2);
        assert_eq!(batch.malformed, 1);
        assert_eq!(batch.degraded, 0);
    }

    #[test]
    fn test_json_kind() {
        assert_eq!(json_kind(&json!(1)), "number");
        assert_eq!(json_kind(&json!({})), "object");
    }
}
