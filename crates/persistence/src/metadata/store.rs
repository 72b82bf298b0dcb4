//! The metadata store and its durable JSON document.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::stats::{FieldSnapshot, FieldStatistics};
use crate::classify::RuleBook;
use crate::error::MetadataError;
use crate::placement::is_unique;
use crate::types::{Placement, PlacementDecision, SemanticType};

/// Version written into every metadata document.
pub const METADATA_FORMAT_VERSION: u32 = 1;

/// Default capacity of each field's sample reservoir.
pub const DEFAULT_SAMPLE_CAPACITY: usize = 50;

#[derive(Debug, Default)]
struct MetadataState {
    fields: BTreeMap<String, FieldStatistics>,
    normalization_rules: BTreeMap<String, String>,
    total_records_seen: u64,
}

/// The durable document, borrowed for writing.
#[derive(Serialize)]
struct MetadataDocumentRef<'a> {
    version: u32,
    fields: &'a BTreeMap<String, FieldStatistics>,
    normalization_rules: &'a BTreeMap<String, String>,
    total_records_seen: u64,
}

/// The durable document, owned for reading.
#[derive(Deserialize)]
struct MetadataDocument {
    version: u32,
    #[serde(default)]
    fields: BTreeMap<String, FieldStatistics>,
    #[serde(default)]
    normalization_rules: BTreeMap<String, String>,
    #[serde(default)]
    total_records_seen: u64,
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataSummary {
    /// Accepted records.
    pub total_records_seen: u64,
    /// Known canonical fields.
    pub field_count: usize,
    /// Recorded normalization rules.
    pub rule_count: usize,
    /// Fields currently placed relationally.
    pub relational_fields: usize,
    /// Fields currently placed in the document store.
    pub document_fields: usize,
    /// Fields currently placed in both.
    pub both_fields: usize,
}

/// Owner of all per-field statistics, normalization rules and the record
/// counter.
///
/// The store is constructed explicitly and can be shared behind an `Arc`.
/// Mutations serialize on an internal write lock; readers get cloned
/// snapshots. [`save`](Self::save) replaces the durable copy atomically.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use serde_json::json;
/// use strata_persistence::metadata::MetadataStore;
/// use strata_persistence::types::SemanticType;
///
/// let store = MetadataStore::in_memory();
/// store.record_seen();
/// let snapshot = store.observe("battery", SemanticType::Integer, &json!(80), Utc::now());
/// assert_eq!(snapshot.stats.appearances, 1);
/// assert_eq!(snapshot.frequency(), 100.0);
/// ```
#[derive(Debug)]
pub struct MetadataStore {
    path: Option<PathBuf>,
    sample_capacity: usize,
    state: RwLock<MetadataState>,
    save_guard: Mutex<()>,
}

impl MetadataStore {
    /// Creates an empty store with no durable location.
    pub fn in_memory() -> Self {
        Self::from_state(None, MetadataState::default())
    }

    fn from_state(path: Option<PathBuf>, state: MetadataState) -> Self {
        Self {
            path,
            sample_capacity: DEFAULT_SAMPLE_CAPACITY,
            state: RwLock::new(state),
            save_guard: Mutex::new(()),
        }
    }

    /// Loads the store from `path`.
    ///
    /// A missing file yields an empty store bound to `path`. A file that
    /// exists but cannot be parsed is an error; the caller decides whether
    /// to start over.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, MetadataError> {
        let path = path.into();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No metadata file, starting empty");
                return Ok(Self::from_state(Some(path), MetadataState::default()));
            }
            Err(source) => return Err(MetadataError::Io { path, source }),
        };

        let document: MetadataDocument =
            serde_json::from_slice(&bytes).map_err(|e| MetadataError::Corrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;

        if document.version != METADATA_FORMAT_VERSION {
            return Err(MetadataError::UnsupportedVersion {
                path,
                found: document.version,
                expected: METADATA_FORMAT_VERSION,
            });
        }

        info!(
            path = %path.display(),
            fields = document.fields.len(),
            rules = document.normalization_rules.len(),
            total_records_seen = document.total_records_seen,
            "Loaded metadata"
        );
        let state = MetadataState {
            fields: document.fields,
            normalization_rules: document.normalization_rules,
            total_records_seen: document.total_records_seen,
        };
        Ok(Self::from_state(Some(path), state))
    }

    /// Sets the capacity of each field's sample reservoir.
    pub fn with_sample_capacity(mut self, capacity: usize) -> Self {
        self.sample_capacity = capacity.max(1);
        self
    }

    /// The durable location, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the store to its durable location.
    ///
    /// The document is written to a sibling temporary file, synced, then
    /// renamed over the previous copy, so a failed save leaves the last good
    /// copy intact. A store without a path saves nothing.
    pub async fn save(&self) -> Result<(), MetadataError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _guard = self.save_guard.lock().await;

        let bytes = {
            let state = self.state.read();
            serde_json::to_vec_pretty(&MetadataDocumentRef {
                version: METADATA_FORMAT_VERSION,
                fields: &state.fields,
                normalization_rules: &state.normalization_rules,
                total_records_seen: state.total_records_seen,
            })
            .map_err(|e| MetadataError::Serialize {
                message: e.to_string(),
            })?
        };

        let tmp = temp_path(path);
        write_synced(&tmp, &bytes)
            .await
            .map_err(|source| MetadataError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| MetadataError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), bytes = bytes.len(), "Saved metadata");
        Ok(())
    }

    /// Records one observation of `field` and returns the updated snapshot.
    pub fn observe(
        &self,
        field: &str,
        semantic: SemanticType,
        raw_value: &Value,
        seen_at: DateTime<Utc>,
    ) -> FieldSnapshot {
        let mut state = self.state.write();
        let total_records_seen = state.total_records_seen;
        let stats = state.fields.entry(field.to_string()).or_default();
        if stats.appearances == 0 {
            debug!(field = %field, semantic = %semantic, "New field observed");
        }
        stats.record(semantic, raw_value, seen_at, self.sample_capacity);
        stats.is_unique = is_unique(field, stats);

        FieldSnapshot {
            name: field.to_string(),
            stats: stats.clone(),
            total_records_seen,
        }
    }

    /// Counts one accepted record and returns the new total.
    pub fn record_seen(&self) -> u64 {
        let mut state = self.state.write();
        state.total_records_seen += 1;
        state.total_records_seen
    }

    /// Total accepted records.
    pub fn total_records_seen(&self) -> u64 {
        self.state.read().total_records_seen
    }

    /// Stores the latest placement decision for `field` and returns the
    /// previous one. Unknown fields are ignored.
    pub fn set_placement(
        &self,
        field: &str,
        decision: PlacementDecision,
    ) -> Option<PlacementDecision> {
        let mut state = self.state.write();
        let stats = state.fields.get_mut(field)?;
        stats.current_placement.replace(decision)
    }

    /// Returns a snapshot of one field.
    pub fn field(&self, name: &str) -> Option<FieldSnapshot> {
        let state = self.state.read();
        state.fields.get(name).map(|stats| FieldSnapshot {
            name: name.to_string(),
            stats: stats.clone(),
            total_records_seen: state.total_records_seen,
        })
    }

    /// Returns snapshots of all fields, ordered by name.
    pub fn snapshot(&self) -> Vec<FieldSnapshot> {
        let state = self.state.read();
        state
            .fields
            .iter()
            .map(|(name, stats)| FieldSnapshot {
                name: name.clone(),
                stats: stats.clone(),
                total_records_seen: state.total_records_seen,
            })
            .collect()
    }

    /// Returns a copy of all recorded normalization rules.
    pub fn normalization_rules(&self) -> BTreeMap<String, String> {
        self.state.read().normalization_rules.clone()
    }

    /// Aggregate counts.
    pub fn summary(&self) -> MetadataSummary {
        let state = self.state.read();
        let mut summary = MetadataSummary {
            total_records_seen: state.total_records_seen,
            field_count: state.fields.len(),
            rule_count: state.normalization_rules.len(),
            ..Default::default()
        };
        for stats in state.fields.values() {
            match stats.current_placement.map(|d| d.placement) {
                Some(Placement::Relational) => summary.relational_fields += 1,
                Some(Placement::Document) => summary.document_fields += 1,
                Some(Placement::Both) => summary.both_fields += 1,
                None => {}
            }
        }
        summary
    }
}

impl RuleBook for MetadataStore {
    fn lookup(&self, raw: &str) -> Option<String> {
        self.state.read().normalization_rules.get(raw).cloned()
    }

    fn record(&self, raw: &str, canonical: &str) -> String {
        self.state
            .write()
            .normalization_rules
            .entry(raw.to_string())
            .or_insert_with(|| canonical.to_string())
            .clone()
    }
}

/// Sibling path used while saving: the full file name plus `.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("metadata"));
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}
