//! Database backend implementations.
//!
//! # Available Backends
//!
//! | Backend | Side | Feature | Description |
//! |---------|------|---------|-------------|
//! | SQLite | relational | `sqlite` (default) | Embedded database holding the evolving records table |
//! | MongoDB | document | `mongodb` | Document store with native JSON support |
//! | Memory | document | always | In-process map, for tests and embedded use |
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! use strata_persistence::backends::sqlite::SqliteBackend;
//! use strata_persistence::backends::memory::MemoryDocumentStore;
//!
//! # #[cfg(feature = "sqlite")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let relational = SqliteBackend::open("./data/records.db")?;
//! let documents = MemoryDocumentStore::new();
//! # Ok(())
//! # }
//! ```

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mongodb")]
pub mod mongodb;
