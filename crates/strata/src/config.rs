//! Command line and environment configuration.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STRATA_INPUT` | stdin | NDJSON file to ingest |
//! | `STRATA_DATABASE` | strata.db | SQLite database path (`:memory:` allowed) |
//! | `STRATA_METADATA` | strata_metadata.json | Metadata document path |
//! | `STRATA_DOCUMENT_BACKEND` | none | `none`, `mongodb` or `memory` |
//! | `STRATA_MONGODB_URI` | mongodb://localhost:27017 | MongoDB connection string |
//! | `STRATA_MONGODB_DATABASE` | strata | MongoDB database |
//! | `STRATA_FREQUENCY_THRESHOLD` | 60 | Minimum frequency (%) for relational placement |
//! | `STRATA_STABILITY_THRESHOLD` | 80 | Minimum type stability (%) for relational placement |
//! | `STRATA_MIN_OBSERVATIONS` | 10 | Observations before a field can leave the document side |
//! | `STRATA_PERSIST_EVERY` | 100 | Save metadata after this many records |
//! | `STRATA_LOG_LEVEL` | info | Log level |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use strata_persistence::config::{PipelineConfig, PlacementThresholds};

/// Where document projections go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentBackendMode {
    /// The in-process store. Documents do not outlive the process.
    Memory,
    /// MongoDB (requires the `mongodb` feature).
    MongoDb,
    /// No document backend; every field is written relationally.
    #[default]
    None,
}

impl fmt::Display for DocumentBackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentBackendMode::Memory => write!(f, "memory"),
            DocumentBackendMode::MongoDb => write!(f, "mongodb"),
            DocumentBackendMode::None => write!(f, "none"),
        }
    }
}

impl FromStr for DocumentBackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(DocumentBackendMode::Memory),
            "mongodb" | "mongo" => Ok(DocumentBackendMode::MongoDb),
            "none" | "off" => Ok(DocumentBackendMode::None),
            other => Err(format!(
                "unknown document backend '{}' (expected memory, mongodb or none)",
                other
            )),
        }
    }
}

/// Strata configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "strata")]
#[command(about = "Ingest newline-delimited JSON into an adaptive relational/document layout")]
pub struct StrataConfig {
    /// NDJSON file to ingest. Reads stdin when absent.
    #[arg(short, long, env = "STRATA_INPUT")]
    pub input: Option<PathBuf>,

    /// SQLite database path.
    #[arg(long, env = "STRATA_DATABASE", default_value = "strata.db")]
    pub database: String,

    /// Metadata document path.
    #[arg(long, env = "STRATA_METADATA", default_value = "strata_metadata.json")]
    pub metadata: PathBuf,

    /// Document backend: none, mongodb or memory. Without one, every field
    /// is stored in SQLite.
    #[arg(long, env = "STRATA_DOCUMENT_BACKEND", default_value = "none")]
    pub document_backend: DocumentBackendMode,

    /// MongoDB connection string.
    #[arg(long, env = "STRATA_MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name.
    #[arg(long, env = "STRATA_MONGODB_DATABASE", default_value = "strata")]
    pub mongodb_database: String,

    /// Minimum frequency (%) for relational placement.
    #[arg(long, env = "STRATA_FREQUENCY_THRESHOLD", default_value = "60")]
    pub frequency_threshold: f64,

    /// Minimum type stability (%) for relational placement.
    #[arg(long, env = "STRATA_STABILITY_THRESHOLD", default_value = "80")]
    pub stability_threshold: f64,

    /// Observations required before a field can be placed relationally.
    #[arg(long, env = "STRATA_MIN_OBSERVATIONS", default_value = "10")]
    pub min_observations: u64,

    /// Save metadata after this many accepted records (0 = only at the end).
    #[arg(long, env = "STRATA_PERSIST_EVERY", default_value = "100")]
    pub persist_every: u64,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "STRATA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for StrataConfig {
    fn default() -> Self {
        Self {
            input: None,
            database: "strata.db".to_string(),
            metadata: PathBuf::from("strata_metadata.json"),
            document_backend: DocumentBackendMode::None,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "strata".to_string(),
            frequency_threshold: 60.0,
            stability_threshold: 80.0,
            min_observations: 10,
            persist_every: 100,
            log_level: "info".to_string(),
        }
    }
}

impl StrataConfig {
    /// Builds the pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            thresholds: PlacementThresholds {
                frequency_threshold: self.frequency_threshold,
                stability_threshold: self.stability_threshold,
                min_observations: self.min_observations,
            },
            persist_every: self.persist_every,
            ..Default::default()
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.pipeline_config().validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.database.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if self.metadata.as_os_str().is_empty() {
            errors.push("Metadata path cannot be empty".to_string());
        }

        if self.document_backend == DocumentBackendMode::MongoDb {
            if self.mongodb_uri.trim().is_empty() {
                errors.push("MongoDB URI cannot be empty".to_string());
            }
            if self.mongodb_database.trim().is_empty() {
                errors.push("MongoDB database cannot be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing: in-memory SQLite, the
    /// in-process document store and no periodic persistence.
    pub fn for_testing() -> Self {
        Self {
            database: ":memory:".to_string(),
            document_backend: DocumentBackendMode::Memory,
            log_level: "debug".to_string(),
            persist_every: 0,
            ..Default::default()
        }
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strata={0},strata_persistence={0}", level)));

    // Diagnostics go to stderr; stdout carries the final report.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
