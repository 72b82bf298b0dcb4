//! MongoDB document backend.
//!
//! Stores the document projection of each record in one collection,
//! `ingested_records`, with a unique index on `sys_ingested_at` and a plain
//! index on `username`.
//!
//! # Example
//!
//! ```no_run
//! use strata_persistence::backends::mongodb::{MongoBackend, MongoBackendConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = MongoBackend::connect(MongoBackendConfig::default()).await?;
//! # Ok(())
//! # }
//! ```

mod backend;

pub use backend::{MongoBackend, MongoBackendConfig};
