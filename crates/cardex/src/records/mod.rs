//! Durable storage for business card records.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::model::{BusinessCard, JobStatus};

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Failed to encode record '{id}': {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Stored record '{id}' is corrupt: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Record store unavailable: {0}")]
    Unavailable(String),
}

/// One record per submitted card, keyed by card id.
///
/// Implementations must make `transition_status` atomic: of several
/// concurrent calls with the same `from`, at most one returns `true`.
///
/// The observation belongs to the editor, not to the pipeline: `put` sets it
/// only when the record is first created, and afterwards only
/// `set_observation` changes it. The two writers never overwrite each other.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores the record, replacing any previous version except for its
    /// observation.
    async fn put(&self, card: &BusinessCard) -> Result<(), RecordError>;

    /// Fails with [`RecordError::NotFound`] if no record has this id.
    async fn get(&self, id: &str) -> Result<BusinessCard, RecordError>;

    async fn scan(&self) -> Result<Vec<BusinessCard>, RecordError>;

    async fn scan_by_status(&self, status: JobStatus) -> Result<Vec<BusinessCard>, RecordError>;

    /// Sets the status to `to` only if it currently is `from`.
    ///
    /// Returns `false` (and writes nothing) when the record is missing or
    /// holds a different status.
    async fn transition_status(
        &self,
        id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, RecordError>;

    /// Replaces the observation of an existing record and nothing else.
    ///
    /// Fails with [`RecordError::NotFound`] if no record has this id.
    async fn set_observation(&self, id: &str, observation: &str) -> Result<(), RecordError>;
}
