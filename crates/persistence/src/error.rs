//! Error types for the ingestion engine.
//!
//! Errors are grouped by where they originate: malformed input records,
//! backend I/O, metadata persistence and configuration. Classification itself
//! never fails, so there is no error category for it.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The input record was rejected before reaching any backend.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// A relational or document backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Loading or saving the metadata store failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// The supplied configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StorageError {
    /// Returns true if the error was caused by the input record rather than
    /// by the system.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, StorageError::Ingest(_))
    }
}

/// Errors for records that cannot be ingested.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The record has no usable identity field.
    #[error("record is missing the identity field '{field}'")]
    MissingIdentity { field: String },

    /// The record is not a JSON object.
    #[error("record must be a JSON object, got {found}")]
    NotAnObject { found: String },

    /// A line from the upstream source could not be decoded.
    #[error("undecodable record at line {line}: {message}")]
    Undecodable { line: u64, message: String },
}

/// Errors originating from a database backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is not configured or currently marked unhealthy.
    #[error("backend unavailable: {backend_name}")]
    Unavailable {
        backend_name: String,
        message: String,
    },

    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Connection pool exhausted.
    #[error("connection pool exhausted for {backend_name}")]
    PoolExhausted { backend_name: String },

    /// An additive schema change could not be applied.
    #[error("schema evolution failed for column '{column}': {message}")]
    SchemaEvolution { column: String, message: String },

    /// A write was rejected by the backend (constraint violation and similar).
    #[error("write rejected by {backend_name}: {message}")]
    WriteRejected {
        backend_name: String,
        message: String,
    },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution error.
    #[error("query execution failed: {message}")]
    QueryError { message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

impl BackendError {
    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Unavailable { .. }
                | BackendError::ConnectionFailed { .. }
                | BackendError::PoolExhausted { .. }
                | BackendError::Internal { .. }
        )
    }
}

/// Errors related to the durable metadata document.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The metadata file exists but could not be parsed.
    #[error("metadata file {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// The metadata file was written by an incompatible version.
    #[error("metadata file {path} has unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// Reading or writing the metadata file failed.
    #[error("metadata i/o failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory state could not be serialized.
    #[error("failed to serialize metadata: {message}")]
    Serialize { message: String },
}

/// Invalid configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more configuration values are out of range.
    #[error("invalid configuration: {}", .errors.join("; "))]
    Invalid { errors: Vec<String> },
}

/// Result type alias for engine operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Backend(BackendError::SerializationError {
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::SerializationError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Internal {
            backend_name: "unknown".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        let rusqlite::Error::SqliteFailure(code, _) = &err else {
            // Binding and conversion errors fail the same way every time.
            return BackendError::QueryError {
                message: err.to_string(),
            };
        };
        match code.code {
            ErrorCode::ConstraintViolation => BackendError::WriteRejected {
                backend_name: "sqlite".to_string(),
                message: err.to_string(),
            },
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => BackendError::Unavailable {
                backend_name: "sqlite".to_string(),
                message: err.to_string(),
            },
            ErrorCode::SystemIoFailure | ErrorCode::CannotOpen | ErrorCode::OutOfMemory => {
                BackendError::Internal {
                    backend_name: "sqlite".to_string(),
                    message: err.to_string(),
                    source: Some(Box::new(err)),
                }
            }
            _ => BackendError::QueryError {
                message: err.to_string(),
            },
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Backend(err.into())
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for BackendError {
    fn from(_err: r2d2::Error) -> Self {
        BackendError::PoolExhausted {
            backend_name: "sqlite".to_string(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StorageError {
    fn from(err: r2d2::Error) -> Self {
        StorageError::Backend(err.into())
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for BackendError {
    fn from(err: mongodb::error::Error) -> Self {
        BackendError::Internal {
            backend_name: "mongodb".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::Backend(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_display() {
        let err = StorageError::Ingest(IngestError::MissingIdentity {
            field: "username".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "record is missing the identity field 'username'"
        );
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::SchemaEvolution {
            column: "email".to_string(),
            message: "duplicate column".to_string(),
        };
        assert!(err.to_string().contains("email"));

        let storage_err: StorageError = err.into();
        assert!(matches!(storage_err, StorageError::Backend(_)));
        assert!(!storage_err.is_malformed_input());
    }

    #[test]
    fn test_transient_backend_errors() {
        assert!(
            BackendError::PoolExhausted {
                backend_name: "sqlite".to_string()
            }
            .is_transient()
        );
        assert!(
            !BackendError::WriteRejected {
                backend_name: "sqlite".to_string(),
                message: "UNIQUE constraint failed".to_string()
            }
            .is_transient()
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_error_classification() {
        fn failure(code: std::os::raw::c_int) -> BackendError {
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None).into()
        }

        let busy = failure(rusqlite::ffi::SQLITE_BUSY);
        assert!(matches!(busy, BackendError::Unavailable { .. }));
        assert!(busy.is_transient());
        assert!(failure(rusqlite::ffi::SQLITE_LOCKED).is_transient());

        let constraint = failure(rusqlite::ffi::SQLITE_CONSTRAINT);
        assert!(matches!(constraint, BackendError::WriteRejected { .. }));
        assert!(!constraint.is_transient());

        let malformed = failure(rusqlite::ffi::SQLITE_ERROR);
        assert!(matches!(malformed, BackendError::QueryError { .. }));
        assert!(!malformed.is_transient());
        assert!(!failure(rusqlite::ffi::SQLITE_MISMATCH).is_transient());

        let conversion: BackendError =
            rusqlite::Error::InvalidColumnType(0, "battery".to_string(), rusqlite::types::Type::Text)
                .into();
        assert!(!conversion.is_transient());
    }

    #[test]
    fn test_config_error_joins_messages() {
        let err = ConfigError::Invalid {
            errors: vec!["a is bad".to_string(), "b is bad".to_string()],
        };
        assert_eq!(err.to_string(), "invalid configuration: a is bad; b is bad");
    }

    #[test]
    fn test_serde_error_converts_to_serialization() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: StorageError = parse_err.into();
        assert!(matches!(
            err,
            StorageError::Backend(BackendError::SerializationError { .. })
        ));
    }

    #[test]
    fn test_metadata_error_display() {
        let err = MetadataError::UnsupportedVersion {
            path: PathBuf::from("meta.json"),
            found: 9,
            expected: 1,
        };
        assert!(err.to_string().contains("unsupported version 9"));
    }
}
