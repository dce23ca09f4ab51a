use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::extract::ExtractionError;
use crate::model::{BusinessCard, InvalidTransition, JobStatus};
use crate::records::RecordError;
use crate::secrets::SecretError;

/// Coarse failure categories callers can branch on.
///
/// Stored on failed records next to the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    StorageWriteFailed,
    StorageReadFailed,
    ExtractionFailed,
    ExtractionUnparseable,
    NotFound,
    InvalidState,
    RecordStoreUnavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StorageWriteFailed => "storage_write_failed",
            ErrorKind::StorageReadFailed => "storage_read_failed",
            ErrorKind::ExtractionFailed => "extraction_failed",
            ErrorKind::ExtractionUnparseable => "extraction_unparseable",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::RecordStoreUnavailable => "record_store_unavailable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            ErrorKind::InvalidInput,
            ErrorKind::StorageWriteFailed,
            ErrorKind::StorageReadFailed,
            ErrorKind::ExtractionFailed,
            ErrorKind::ExtractionUnparseable,
            ErrorKind::NotFound,
            ErrorKind::InvalidState,
            ErrorKind::RecordStoreUnavailable,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == s)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the card pipeline and its query operations.
#[derive(Error, Debug)]
pub enum CardError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to store image '{file_name}': {source}")]
    StorageWriteFailed {
        file_name: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to read image '{storage_key}': {source}")]
    StorageReadFailed {
        storage_key: String,
        #[source]
        source: StorageError,
    },

    #[error("Extraction failed: {0}")]
    ExtractionFailed(#[source] ExtractionError),

    #[error("Extraction output could not be parsed: {0}")]
    ExtractionUnparseable(#[source] ExtractionError),

    #[error("Business card not found: {0}")]
    NotFound(String),

    #[error("Business card '{id}' cannot move from {from} to {to}")]
    InvalidState {
        id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// Persisting failed. When the failing write was the final one of an
    /// attempt, `unsaved` holds the record as it would have been stored.
    #[error("Record store unavailable: {source}")]
    RecordStoreUnavailable {
        #[source]
        source: RecordError,
        unsaved: Option<Box<BusinessCard>>,
    },
}

impl CardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CardError::InvalidInput(_) => ErrorKind::InvalidInput,
            CardError::StorageWriteFailed { .. } => ErrorKind::StorageWriteFailed,
            CardError::StorageReadFailed { .. } => ErrorKind::StorageReadFailed,
            CardError::ExtractionFailed(_) => ErrorKind::ExtractionFailed,
            CardError::ExtractionUnparseable(_) => ErrorKind::ExtractionUnparseable,
            CardError::NotFound(_) => ErrorKind::NotFound,
            CardError::InvalidState { .. } => ErrorKind::InvalidState,
            CardError::RecordStoreUnavailable { .. } => ErrorKind::RecordStoreUnavailable,
        }
    }

    /// Maps a record store failure, turning a missing row into `NotFound`.
    pub(crate) fn from_record(err: RecordError) -> Self {
        match err {
            RecordError::NotFound(id) => CardError::NotFound(id),
            other => CardError::RecordStoreUnavailable {
                source: other,
                unsaved: None,
            },
        }
    }

    pub(crate) fn invalid_transition(id: &str, err: InvalidTransition) -> Self {
        CardError::InvalidState {
            id: id.to_string(),
            from: err.from,
            to: err.to,
        }
    }

    pub(crate) fn unsaved(err: RecordError, card: BusinessCard) -> Self {
        CardError::RecordStoreUnavailable {
            source: err,
            unsaved: Some(Box::new(card)),
        }
    }
}

impl From<ExtractionError> for CardError {
    fn from(err: ExtractionError) -> Self {
        if err.is_unparseable() {
            CardError::ExtractionUnparseable(err)
        } else {
            CardError::ExtractionFailed(err)
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete '{path}': {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid URL lifetime: {0}")]
    InvalidTtl(String),

    #[error("Blob store unavailable: {0}")]
    Unavailable(String),
}

/// Errors while wiring the service together from a config file.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] SecretError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Extractor setup failed: {0}")]
    Extractor(#[from] ExtractionError),
}

pub type Result<T> = std::result::Result<T, CardError>;
