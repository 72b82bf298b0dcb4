//! Shared test infrastructure for the ingestion engine.
//!
//! Builds pipelines over an in-memory SQLite table and an in-process
//! document store, and generates records.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{Value, json};

use strata_persistence::backends::memory::MemoryDocumentStore;
use strata_persistence::backends::sqlite::SqliteBackend;
use strata_persistence::config::{HealthConfig, PipelineConfig};
use strata_persistence::core::DocumentBackend;
use strata_persistence::metadata::MetadataStore;
use strata_persistence::pipeline::IngestionPipeline;
use strata_persistence::writer::DualWriter;

/// A pipeline together with handles to its backends.
pub struct Harness {
    pub pipeline: Arc<IngestionPipeline>,
    pub relational: Arc<SqliteBackend>,
    pub documents: Arc<MemoryDocumentStore>,
}

/// Builder for test pipelines.
pub struct HarnessBuilder {
    config: PipelineConfig,
    metadata: Option<MetadataStore>,
    documents: Arc<MemoryDocumentStore>,
    with_documents: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::for_testing(),
            metadata: None,
            documents: Arc::new(MemoryDocumentStore::new()),
            with_documents: true,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn health(mut self, health: HealthConfig) -> Self {
        self.config.health = health;
        self
    }

    pub fn metadata(mut self, metadata: MetadataStore) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Starts with the document store offline.
    pub fn documents_offline(self) -> Self {
        self.documents.set_offline(true);
        self
    }

    /// Runs without any document backend.
    pub fn without_documents(mut self) -> Self {
        self.with_documents = false;
        self
    }

    pub async fn build(self) -> Harness {
        let relational = Arc::new(SqliteBackend::in_memory().expect("sqlite backend"));
        let document: Option<Arc<dyn DocumentBackend>> = if self.with_documents {
            Some(self.documents.clone() as Arc<dyn DocumentBackend>)
        } else {
            None
        };

        let writer = DualWriter::connect(
            relational.clone(),
            document,
            self.config.retry.clone(),
            self.config.health.clone(),
        )
        .await
        .expect("writer connects");

        let metadata = self.metadata.unwrap_or_else(MetadataStore::in_memory);
        let pipeline =
            IngestionPipeline::new(self.config, metadata, writer).expect("valid pipeline");

        Harness {
            pipeline: Arc::new(pipeline),
            relational,
            documents: self.documents,
        }
    }
}

/// A pipeline with default test settings.
pub async fn harness() -> Harness {
    HarnessBuilder::new().build().await
}

/// A minimal telemetry record.
pub fn device_record(i: usize) -> Value {
    json!({
        "userName": format!("user{}", i % 7),
        "battery": (i % 100) as i64,
        "network": if i % 2 == 0 { "wifi" } else { "lte" },
    })
}
