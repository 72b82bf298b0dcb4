//! In-process document store.
//!
//! Keeps documents in a map keyed by the server ingestion timestamp. Useful
//! for tests and for embedding the engine without a document database. The
//! store can be switched offline to exercise the writer's degraded mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::core::{BackendKind, DocumentBackend};
use crate::error::{BackendError, BackendResult};
use crate::types::{Projection, SERVER_TIMESTAMP_FIELD};

/// Document store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, Value>>,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with
    /// [`BackendError::Unavailable`] until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns all stored documents, in no particular order.
    pub fn documents(&self) -> Vec<Value> {
        self.documents.read().values().cloned().collect()
    }

    fn ensure_online(&self) -> BackendResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable {
                backend_name: "memory".to_string(),
                message: "store is offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for MemoryDocumentStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    async fn initialize(&self) -> BackendResult<()> {
        self.ensure_online()
    }

    async fn insert_document(&self, document: &Projection) -> BackendResult<()> {
        self.ensure_online()?;
        let key = document
            .get(SERVER_TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::WriteRejected {
                backend_name: "memory".to_string(),
                message: format!("document has no '{}'", SERVER_TIMESTAMP_FIELD),
            })?;

        let mut documents = self.documents.write();
        if documents.contains_key(key) {
            return Err(BackendError::WriteRejected {
                backend_name: "memory".to_string(),
                message: format!("duplicate {} '{}'", SERVER_TIMESTAMP_FIELD, key),
            });
        }
        documents.insert(key.to_string(), Value::Object(document.clone()));
        Ok(())
    }

    async fn find_by_join_key(&self, sys_ingested_at: &str) -> BackendResult<Option<Value>> {
        self.ensure_online()?;
        Ok(self.documents.read().get(sys_ingested_at).cloned())
    }

    async fn count(&self) -> BackendResult<u64> {
        self.ensure_online()?;
        Ok(self.documents.read().len() as u64)
    }

    async fn health_check(&self) -> BackendResult<()> {
        self.ensure_online()
    }
}
