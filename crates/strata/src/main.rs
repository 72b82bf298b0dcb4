//! Strata
//!
//! Reads newline-delimited JSON, learns where each field belongs and writes
//! records to SQLite and a document store.

mod config;
mod source;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use strata_persistence::core::{DocumentBackend, RelationalBackend};
use strata_persistence::metadata::MetadataStore;
use strata_persistence::{
    DualWriter, FieldReport, IngestionPipeline, PipelineStats, PlacementSummary,
};

use config::{DocumentBackendMode, StrataConfig, init_logging};
use source::{SourceReport, ingest_ndjson};

/// Printed to stdout when ingestion finishes.
#[derive(Serialize)]
struct RunReport {
    source: SourceReport,
    stats: PipelineStats,
    placement: PlacementSummary,
    fields: Vec<FieldReport>,
}

/// Creates the SQLite backend from the configuration.
#[cfg(feature = "sqlite")]
fn create_relational_backend(config: &StrataConfig) -> anyhow::Result<Arc<dyn RelationalBackend>> {
    use strata_persistence::backends::sqlite::SqliteBackend;

    info!(database = %config.database, "Initializing SQLite backend");
    Ok(Arc::new(SqliteBackend::open(&config.database)?))
}

/// Fallback when sqlite feature is not enabled.
#[cfg(not(feature = "sqlite"))]
fn create_relational_backend(_config: &StrataConfig) -> anyhow::Result<Arc<dyn RelationalBackend>> {
    anyhow::bail!(
        "A relational backend requires the 'sqlite' feature. \
         Build with: cargo build -p strata --features sqlite"
    )
}

/// Creates the MongoDB backend from the configuration.
#[cfg(feature = "mongodb")]
async fn create_mongodb_backend(config: &StrataConfig) -> anyhow::Result<Arc<dyn DocumentBackend>> {
    use strata_persistence::backends::mongodb::{MongoBackend, MongoBackendConfig};

    let mongo_config = MongoBackendConfig {
        uri: config.mongodb_uri.clone(),
        database: config.mongodb_database.clone(),
    };
    info!(database = %mongo_config.database, "Initializing MongoDB backend");
    Ok(Arc::new(MongoBackend::connect(mongo_config).await?))
}

/// Fallback when mongodb feature is not enabled.
#[cfg(not(feature = "mongodb"))]
async fn create_mongodb_backend(_config: &StrataConfig) -> anyhow::Result<Arc<dyn DocumentBackend>> {
    anyhow::bail!(
        "The mongodb document backend requires the 'mongodb' feature. \
         Build with: cargo build -p strata --features mongodb"
    )
}

async fn create_document_backend(
    config: &StrataConfig,
) -> anyhow::Result<Option<Arc<dyn DocumentBackend>>> {
    use strata_persistence::backends::memory::MemoryDocumentStore;

    Ok(match config.document_backend {
        DocumentBackendMode::Memory => {
            warn!("In-process document store selected; documents are lost when the run ends");
            Some(Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentBackend>)
        }
        DocumentBackendMode::MongoDb => Some(create_mongodb_backend(config).await?),
        DocumentBackendMode::None => None,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StrataConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        database = %config.database,
        metadata = %config.metadata.display(),
        document_backend = %config.document_backend,
        frequency_threshold = config.frequency_threshold,
        stability_threshold = config.stability_threshold,
        min_observations = config.min_observations,
        "Starting Strata"
    );

    let pipeline_config = config.pipeline_config();
    let relational = create_relational_backend(&config)?;
    let document = create_document_backend(&config).await?;
    let writer = DualWriter::connect(
        relational,
        document,
        pipeline_config.retry.clone(),
        pipeline_config.health.clone(),
    )
    .await?;
    let metadata = MetadataStore::load(&config.metadata).await?;
    let pipeline = IngestionPipeline::new(pipeline_config, metadata, writer)?;

    let source = match &config.input {
        Some(path) => {
            info!(input = %path.display(), "Reading records");
            let file = tokio::fs::File::open(path).await?;
            ingest_ndjson(&pipeline, tokio::io::BufReader::new(file)).await?
        }
        None => {
            info!("Reading records from stdin");
            ingest_ndjson(&pipeline, tokio::io::BufReader::new(tokio::io::stdin())).await?
        }
    };

    pipeline.persist().await?;

    let report = RunReport {
        source,
        stats: pipeline.pipeline_stats(),
        placement: pipeline.placement_summary(),
        fields: pipeline.field_report(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(
        accepted = report.stats.accepted,
        malformed = report.stats.malformed,
        errors = report.stats.errors(),
        "Ingestion finished"
    );
    Ok(())
}
