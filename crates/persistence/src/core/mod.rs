//! Core backend traits and abstractions.
//!
//! - [`RelationalBackend`] - the evolving relational table
//! - [`DocumentBackend`] - the schema-less document collection
//! - [`BackendHealth`] - failure tracking used to degrade to relational-only
//!
//! # Implementing a Backend
//!
//! ```ignore
//! use async_trait::async_trait;
//! use strata_persistence::core::{BackendKind, DocumentBackend};
//!
//! #[derive(Debug)]
//! struct MyStore;
//!
//! #[async_trait]
//! impl DocumentBackend for MyStore {
//!     fn kind(&self) -> BackendKind { BackendKind::Custom("mystore") }
//!     fn name(&self) -> &'static str { "mystore" }
//!     // ...
//! }
//! ```

mod backend;
mod health;

pub use backend::{BackendKind, ColumnInfo, DocumentBackend, RelationalBackend};
pub use health::BackendHealth;
