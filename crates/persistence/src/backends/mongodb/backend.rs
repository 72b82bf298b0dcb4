//! MongoDB backend implementation.

use std::fmt::Debug;

use async_trait::async_trait;
use mongodb::bson::{self, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::core::{BackendKind, DocumentBackend};
use crate::error::{BackendError, BackendResult};
use crate::types::{IDENTITY_FIELD, Projection, SERVER_TIMESTAMP_FIELD};

/// Name of the single document collection.
pub const RECORDS_COLLECTION: &str = "ingested_records";

/// MongoDB duplicate key error code.
const DUPLICATE_KEY: i32 = 11000;

/// Configuration for the MongoDB backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoBackendConfig {
    /// Connection string.
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "strata".to_string()
}

impl Default for MongoBackendConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
        }
    }
}

impl MongoBackendConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            errors.push(format!("mongodb uri must use a mongodb scheme, got '{}'", self.uri));
        }
        if self.database.is_empty() {
            errors.push("mongodb database name cannot be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// MongoDB backend for the document projection.
pub struct MongoBackend {
    database: Database,
    collection: Collection<Document>,
    config: MongoBackendConfig,
}

impl Debug for MongoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoBackend")
            .field("database", &self.config.database)
            .field("collection", &RECORDS_COLLECTION)
            .finish_non_exhaustive()
    }
}

impl MongoBackend {
    /// Connects to MongoDB. The connection is established lazily by the
    /// driver; call [`DocumentBackend::initialize`] to verify it and create
    /// indexes.
    pub async fn connect(config: MongoBackendConfig) -> BackendResult<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| BackendError::ConnectionFailed {
                backend_name: "mongodb".to_string(),
                message: e.to_string(),
            })?;
        let database = client.database(&config.database);
        let collection = database.collection::<Document>(RECORDS_COLLECTION);
        debug!(database = %config.database, "Created MongoDB client");
        Ok(Self {
            database,
            collection,
            config,
        })
    }

    /// Returns the backend configuration.
    pub fn config(&self) -> &MongoBackendConfig {
        &self.config
    }
}

#[async_trait]
impl DocumentBackend for MongoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MongoDB
    }

    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn initialize(&self) -> BackendResult<()> {
        self.health_check().await?;

        let join_key = IndexModel::builder()
            .keys(doc! { SERVER_TIMESTAMP_FIELD: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let identity = IndexModel::builder()
            .keys(doc! { IDENTITY_FIELD: 1 })
            .build();
        self.collection.create_index(join_key).await?;
        self.collection.create_index(identity).await?;

        info!(collection = RECORDS_COLLECTION, "MongoDB indexes ready");
        Ok(())
    }

    async fn insert_document(&self, document: &Projection) -> BackendResult<()> {
        let bson_doc = bson::to_document(document).map_err(|e| {
            BackendError::SerializationError {
                message: e.to_string(),
            }
        })?;
        match self.collection.insert_one(bson_doc).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(BackendError::WriteRejected {
                backend_name: "mongodb".to_string(),
                message: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_join_key(&self, sys_ingested_at: &str) -> BackendResult<Option<Value>> {
        let found = self
            .collection
            .find_one(doc! { SERVER_TIMESTAMP_FIELD: sys_ingested_at })
            .await?;
        let Some(mut document) = found else {
            return Ok(None);
        };
        document.remove("_id");
        let value: Value =
            bson::from_document(document).map_err(|e| BackendError::SerializationError {
                message: e.to_string(),
            })?;
        Ok(Some(value))
    }

    async fn count(&self) -> BackendResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }

    async fn health_check(&self) -> BackendResult<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| BackendError::Unavailable {
                backend_name: "mongodb".to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}
