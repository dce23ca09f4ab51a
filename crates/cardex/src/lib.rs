pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod records;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod storage;
pub mod validate;

pub use config::{load_config, Config};
pub use error::{CardError, ConfigError, ErrorKind, Result, SetupError, StorageError};
pub use extract::{Extraction, ExtractionError, Extractor, GeminiExtractor};
pub use model::{BusinessCard, CompanyData, ImageRef, JobStatus, PersonalData, RawImage, Submission};
pub use pipeline::{Backends, CardPipeline, Outcome, RetryCoordinator};
pub use records::{MemoryRecordStore, RecordError, RecordStore, SqliteRecordStore};
pub use secrets::{resolve_secret, SecretError};
pub use service::{CardService, CardWithImages, ImagePayload, ImageUrl};
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore, PresignedUrl};
pub use validate::validate_upload;
