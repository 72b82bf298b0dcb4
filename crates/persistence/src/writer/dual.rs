//! The dual-backend writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{HealthConfig, RetryConfig};
use crate::core::{BackendHealth, DocumentBackend, RelationalBackend};
use crate::error::{BackendError, BackendResult};
use crate::types::{ColumnType, JoinedRecord, Projection, SplitRecord, is_mandatory};

use super::registry::ColumnRegistry;
use super::retry::with_retry;
use super::split::{RoutedRecord, split_record};

/// What happened to one side of a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// The projection was stored.
    Written,
    /// Nothing was sent (no backend, or the backend is unhealthy).
    Skipped,
    /// The backend rejected or failed the write.
    Failed(String),
}

impl WriteStatus {
    /// Returns true if the projection was stored.
    pub fn is_written(&self) -> bool {
        matches!(self, WriteStatus::Written)
    }

    /// Returns true if the write failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, WriteStatus::Failed(_))
    }
}

/// Result of writing one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteOutcome {
    /// Relational side.
    pub relational: WriteStatus,
    /// Document side.
    pub document: WriteStatus,
    /// True if the record was written relational-only, either because no
    /// document backend was available or because the document write failed.
    pub degraded: bool,
    /// Columns added for this record.
    pub columns_added: Vec<String>,
    /// The projections that were sent.
    pub split: SplitRecord,
}

/// Writes routed records to the relational backend and, when available, the
/// document backend.
///
/// Schema evolution is serialized on the column registry lock, so every
/// column is added exactly once even with concurrent writers.
pub struct DualWriter {
    relational: Arc<dyn RelationalBackend>,
    document: Option<Arc<dyn DocumentBackend>>,
    registry: tokio::sync::Mutex<ColumnRegistry>,
    health: Mutex<BackendHealth>,
    health_config: HealthConfig,
    retry: RetryConfig,
    writes_since_probe: AtomicU64,
}

impl std::fmt::Debug for DualWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualWriter")
            .field("relational", &self.relational.name())
            .field("document", &self.document.as_ref().map(|d| d.name()))
            .field("document_healthy", &self.health.lock().is_healthy)
            .finish_non_exhaustive()
    }
}

impl DualWriter {
    /// Initializes both backends and seeds the column registry from the
    /// relational table.
    ///
    /// A document backend that fails to initialize does not prevent startup;
    /// it counts as a failure and the writer may start degraded.
    pub async fn connect(
        relational: Arc<dyn RelationalBackend>,
        document: Option<Arc<dyn DocumentBackend>>,
        retry: RetryConfig,
        health_config: HealthConfig,
    ) -> BackendResult<Self> {
        relational.initialize().await?;
        let columns = relational.columns().await?;
        let registry = ColumnRegistry::from_columns(columns);
        info!(
            backend = relational.name(),
            columns = registry.len(),
            "Relational backend ready"
        );

        let backend_id = document.as_ref().map_or("none", |d| d.name());
        let mut health = BackendHealth::new(backend_id, health_config.clone());

        match &document {
            Some(doc) => match doc.initialize().await {
                Ok(()) => {
                    health.record_success();
                    info!(backend = doc.name(), "Document backend ready");
                }
                Err(e) => {
                    warn!(backend = doc.name(), error = %e, "Document backend failed to initialize");
                    health.record_failure(e.to_string());
                }
            },
            None => {
                warn!("No document backend configured, running relational-only");
            }
        }

        Ok(Self {
            relational,
            document,
            registry: tokio::sync::Mutex::new(registry),
            health: Mutex::new(health),
            health_config,
            retry,
            writes_since_probe: AtomicU64::new(0),
        })
    }

    /// The relational backend.
    pub fn relational(&self) -> &Arc<dyn RelationalBackend> {
        &self.relational
    }

    /// The document backend, if configured.
    pub fn document(&self) -> Option<&Arc<dyn DocumentBackend>> {
        self.document.as_ref()
    }

    /// Returns true if documents are currently being written.
    pub fn document_available(&self) -> bool {
        self.document.is_some() && self.health.lock().is_healthy
    }

    /// A copy of the column registry.
    pub async fn columns(&self) -> ColumnRegistry {
        self.registry.lock().await.clone()
    }

    /// Writes one record.
    ///
    /// The document side is written first. If it fails, the record is split
    /// again relational-only so document-bound fields land in the row
    /// instead of being dropped. A relational failure is reported in the
    /// outcome and does not undo the document.
    pub async fn write(&self, record: &RoutedRecord) -> WriteOutcome {
        let document_available = self.check_document_side().await;
        let mut split = split_record(record, document_available);
        let mut degraded = !document_available;

        let document = if document_available {
            let status = self.write_document(&split.document).await;
            if status.is_failed() {
                debug!(
                    join_key = record.join_key().unwrap_or(""),
                    "Folding document fields into the relational row"
                );
                split = split_record(record, false);
                degraded = true;
            }
            status
        } else {
            WriteStatus::Skipped
        };

        let (relational, columns_added) = match self.write_relational(record, &split).await {
            Ok(added) => (WriteStatus::Written, added),
            Err((e, added)) => {
                warn!(
                    backend = self.relational.name(),
                    join_key = record.join_key().unwrap_or(""),
                    error = %e,
                    "Relational write failed"
                );
                (WriteStatus::Failed(e.to_string()), added)
            }
        };

        WriteOutcome {
            relational,
            document,
            degraded,
            columns_added,
            split,
        }
    }

    /// Looks up both projections of a record by its server ingestion
    /// timestamp.
    pub async fn fetch_joined(&self, sys_ingested_at: &str) -> BackendResult<JoinedRecord> {
        let relational = self.relational.fetch_row(sys_ingested_at).await?;
        let document = match &self.document {
            Some(doc) if self.document_available() => doc.find_by_join_key(sys_ingested_at).await?,
            _ => None,
        };
        Ok(JoinedRecord {
            sys_ingested_at: sys_ingested_at.to_string(),
            relational,
            document,
        })
    }

    /// Decides whether the document side takes this record, probing an
    /// unhealthy backend every `probe_every` writes.
    async fn check_document_side(&self) -> bool {
        let Some(doc) = &self.document else {
            return false;
        };
        if self.health.lock().is_healthy {
            return true;
        }

        let n = self.writes_since_probe.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.health_config.probe_every.max(1) != 0 {
            return false;
        }

        let result = doc.health_check().await;
        let mut health = self.health.lock();
        match result {
            Ok(()) => health.record_success(),
            Err(e) => {
                debug!(backend = doc.name(), error = %e, "Document backend probe failed");
                health.record_failure(e.to_string());
            }
        }
        health.is_healthy
    }

    async fn write_relational(
        &self,
        record: &RoutedRecord,
        split: &SplitRecord,
    ) -> Result<Vec<String>, (BackendError, Vec<String>)> {
        let mut row = split.relational.clone();
        let mut added = Vec::new();

        {
            let mut registry = self.registry.lock().await;
            for field in &record.fields {
                if !row.contains_key(&field.name) {
                    continue;
                }

                if !registry.contains(&field.name) {
                    if let Err(e) = self.add_column(&field.name, field.column_type).await {
                        return Err((e, added));
                    }
                    registry.insert(field.name.clone(), field.column_type);
                    added.push(field.name.clone());

                    if field.unique && !is_mandatory(&field.name) {
                        self.add_unique_index(&field.name).await;
                    }
                }

                if registry.needs_text(&field.name, field.semantic) {
                    if let Some(value) = row.get_mut(&field.name) {
                        *value = text_value(value);
                    }
                }
            }
        }

        let relational = &self.relational;
        let row = &row;
        with_retry("insert_row", &self.retry, move || relational.insert_row(row))
            .await
            .map_err(|e| (e, added.clone()))?;
        Ok(added)
    }

    async fn add_column(&self, name: &str, column_type: ColumnType) -> BackendResult<()> {
        let relational = &self.relational;
        with_retry("add_column", &self.retry, move || {
            relational.add_column(name, column_type)
        })
        .await
    }

    async fn add_unique_index(&self, name: &str) {
        let relational = &self.relational;
        if let Err(e) = with_retry("create_unique_index", &self.retry, move || {
            relational.create_unique_index(name)
        })
        .await
        {
            warn!(column = %name, error = %e, "Unique index not created, continuing without it");
        }
    }

    async fn write_document(&self, document: &Projection) -> WriteStatus {
        let Some(doc) = &self.document else {
            return WriteStatus::Skipped;
        };
        let result = with_retry("insert_document", &self.retry, move || {
            doc.insert_document(document)
        })
        .await;

        let mut health = self.health.lock();
        match result {
            Ok(()) => {
                health.record_success();
                WriteStatus::Written
            }
            Err(e) => {
                warn!(backend = doc.name(), error = %e, "Document write failed");
                if e.is_transient() {
                    health.record_failure(e.to_string());
                }
                WriteStatus::Failed(e.to_string())
            }
        }
    }
}

/// Text form of a value for a permissive column.
fn text_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryDocumentStore;
    use serde_json::json;

    #[test]
    fn test_text_value() {
        assert_eq!(text_value(&json!(1.5)), json!("1.5"));
        assert_eq!(text_value(&json!(true)), json!("true"));
        assert_eq!(text_value(&json!("x")), json!("x"));
        assert_eq!(text_value(&Value::Null), Value::Null);
    }

    #[test]
    fn test_write_status() {
        assert!(WriteStatus::Written.is_written());
        assert!(WriteStatus::Failed("x".to_string()).is_failed());
        assert!(!WriteStatus::Skipped.is_written());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_connect_seeds_registry() {
        let relational = Arc::new(crate::backends::sqlite::SqliteBackend::in_memory().unwrap());
        let document = Arc::new(MemoryDocumentStore::new());
        let writer = DualWriter::connect(
            relational,
            Some(document),
            RetryConfig::none(),
            HealthConfig::default(),
        )
        .await
        .unwrap();
        let columns = writer.columns().await;
        assert!(columns.contains("username"));
        assert!(columns.contains("sys_ingested_at"));
        assert!(columns.contains("t_stamp"));
        assert!(writer.document_available());
    }
}
