//! Error types for the faces study loader

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading records, building a study or querying it
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Failed to decode record: {0}")]
    Decode(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Record file name does not follow <participant>_..._sess<id>: {0}")]
    InvalidFileName(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("No study arm configured for participant {0}")]
    MappingMissing(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StudyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StudyError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        StudyError::NotFound {
            kind,
            key: key.into(),
        }
    }
}
