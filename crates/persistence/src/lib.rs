//! Strata Persistence Layer
//!
//! This crate ingests schema-less JSON records and learns, field by field,
//! where each one belongs: in an evolving relational table, in a document
//! collection, or in both. Fields that appear often with a stable type are
//! promoted to columns; sparse, drifting or nested fields stay in documents.
//! Both sides share a join key, so a record can always be reassembled.
//!
//! # Features
//!
//! - **Field normalization**: `userName`, `user-name` and `USER_NAME` converge
//!   on one canonical name, and the mapping is remembered
//! - **Semantic typing**: values are classified as email, uuid, ip address,
//!   timestamp and similar, not just JSON primitives
//! - **Adaptive placement**: a deterministic decision tree over frequency and
//!   type stability, re-evaluated on every observation
//! - **Additive schema evolution**: columns are added on first relational use,
//!   never altered or dropped
//! - **Degraded mode**: writes continue relational-only while the document
//!   backend is unavailable
//!
//! # Backend Features
//!
//! ```toml
//! [dependencies]
//! strata-persistence = { version = "0.1", features = ["mongodb"] }
//! ```
//!
//! - `sqlite` (default) - SQLite relational backend with in-memory and file modes
//! - `mongodb` - MongoDB document backend
//!
//! An in-process document store ([`backends::memory`]) is always available.
//!
//! # Architecture
//!
//! - [`classify`] - key normalization and semantic type detection
//! - [`metadata`] - per-field statistics and the durable metadata document
//! - [`placement`] - the placement decision tree and uniqueness heuristics
//! - [`writer`] - record splitting, schema evolution and dual writes
//! - [`pipeline`] - the ingestion entry point and query surface
//! - [`core`] - backend traits and health tracking
//! - [`backends`] - backend implementations
//! - [`config`] - thresholds, retry and health policies
//! - [`types`] - shared value and decision types
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use strata_persistence::backends::memory::MemoryDocumentStore;
//! use strata_persistence::backends::sqlite::SqliteBackend;
//! use strata_persistence::{DualWriter, IngestionPipeline, MetadataStore, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let writer = DualWriter::connect(
//!     Arc::new(SqliteBackend::in_memory()?),
//!     Some(Arc::new(MemoryDocumentStore::new())),
//!     config.retry.clone(),
//!     config.health.clone(),
//! )
//! .await?;
//! let pipeline = IngestionPipeline::new(config, MetadataStore::in_memory(), writer)?;
//!
//! for i in 0..100 {
//!     pipeline
//!         .ingest_record(json!({
//!             "userName": format!("user{}", i),
//!             "Email": format!("user{}@example.com", i),
//!             "tags": ["a", "b"],
//!         }))
//!         .await?;
//! }
//!
//! let email = pipeline.field("email").expect("field was observed");
//! assert_eq!(email.frequency, 100.0);
//! println!("email -> {} ({})", email.placement, email.reason);
//! # Ok(())
//! # }
//! ```
//!
//! # Classification
//!
//! ```
//! use serde_json::json;
//! use strata_persistence::classify::TypeDetector;
//! use strata_persistence::types::SemanticType;
//!
//! let detector = TypeDetector::new();
//! assert_eq!(detector.detect(&json!("alice@example.com")), SemanticType::Email);
//! assert_eq!(detector.detect(&json!("10.0.0.1")), SemanticType::IpAddress);
//! assert_eq!(detector.detect(&json!([1, 2])), SemanticType::List);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod classify;
pub mod config;
pub mod core;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod placement;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use config::{HealthConfig, PipelineConfig, PlacementThresholds, RetryConfig};
pub use error::{StorageError, StorageResult};
pub use metadata::MetadataStore;
pub use pipeline::{FieldReport, IngestionPipeline, PipelineStats};
pub use placement::{PlacementEngine, PlacementSummary};
pub use writer::{DualWriter, WriteOutcome};

// Re-export core traits
pub use core::{BackendKind, DocumentBackend, RelationalBackend};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
