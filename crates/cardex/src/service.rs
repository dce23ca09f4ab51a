//! Library entry points: submission, retry, and queries over stored cards.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::error::{CardError, SetupError, StorageError};
use crate::extract::{Extractor, GeminiExtractor};
use crate::model::{BusinessCard, ImageRef, JobStatus, Submission};
use crate::pipeline::{Backends, CardPipeline, Outcome, RetryCoordinator};
use crate::records::{RecordStore, SqliteRecordStore};
use crate::sanitize;
use crate::secrets::resolve_secret;
use crate::storage::{BlobStore, FileBlobStore, PresignedUrl};

/// An image of a card together with its bytes, base64 encoded.
///
/// `data` is `None` when the blob could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    #[serde(flatten)]
    pub image: ImageRef,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardWithImages {
    #[serde(flatten)]
    pub card: BusinessCard,
    pub image_data: Vec<ImagePayload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageUrl {
    pub file_name: String,
    pub storage_key: String,
    #[serde(flatten)]
    pub url: PresignedUrl,
}

fn read_failure_category(err: &StorageError) -> &'static str {
    match err {
        StorageError::NotFound(_) => "not_found",
        StorageError::ReadFile { .. } => "io",
        _ => "other",
    }
}

/// Business card service over injected backends.
#[derive(Clone)]
pub struct CardService {
    backends: Backends,
    pipeline: CardPipeline,
    retries: RetryCoordinator,
}

impl CardService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn Extractor>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let backends = Backends::new(blobs, extractor, records);
        Self {
            pipeline: CardPipeline::new(backends.clone()),
            retries: RetryCoordinator::new(backends.clone()),
            backends,
        }
    }

    /// Production wiring: file blobs, SQLite records, Gemini extraction.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let gemini = &config.gemini;
        let api_key = resolve_secret(
            gemini.api_key.as_deref(),
            gemini.api_key_file.as_deref(),
            gemini.api_key_env_var.as_deref(),
        )?;
        let extractor = GeminiExtractor::new(
            gemini.endpoint.clone(),
            gemini.model.clone(),
            api_key,
            Duration::from_secs(gemini.timeout_secs),
        )?;

        let db_path = config.database.resolved_path().ok_or_else(|| {
            crate::error::ConfigError::Validation {
                message: "database.path is unset and no home directory was found".to_string(),
            }
        })?;
        let db = Database::open(&db_path)?;

        let storage_dir = crate::config::schema::expand_home(&config.storage.directory);
        info!(
            storage = %storage_dir.display(),
            database = %db_path.display(),
            model = %gemini.model,
            "Card service configured"
        );

        Ok(Self::new(
            Arc::new(FileBlobStore::new(storage_dir)),
            Arc::new(extractor),
            Arc::new(SqliteRecordStore::new(db)),
        ))
    }

    pub async fn submit(&self, submission: Submission) -> Result<Outcome, CardError> {
        self.pipeline.submit(submission).await
    }

    pub async fn retry(&self, id: &str) -> Result<Outcome, CardError> {
        self.retries.retry(id).await
    }

    pub async fn get(&self, id: &str) -> Result<BusinessCard, CardError> {
        self.backends
            .records
            .get(id)
            .await
            .map_err(CardError::from_record)
    }

    pub async fn list_all(&self) -> Result<Vec<BusinessCard>, CardError> {
        self.backends
            .records
            .scan()
            .await
            .map_err(CardError::from_record)
    }

    pub async fn list_by_status(&self, status: JobStatus) -> Result<Vec<BusinessCard>, CardError> {
        self.backends
            .records
            .scan_by_status(status)
            .await
            .map_err(CardError::from_record)
    }

    /// Cards waiting for a retry.
    pub async fn list_failed(&self) -> Result<Vec<BusinessCard>, CardError> {
        self.list_by_status(JobStatus::Failed).await
    }

    /// Replaces the free-text observation. Status, counters and images are
    /// left alone, even while a processing run writes the same record.
    pub async fn update_observation(
        &self,
        id: &str,
        observation: impl Into<String>,
    ) -> Result<BusinessCard, CardError> {
        let observation = observation.into();
        self.backends
            .records
            .set_observation(id, &observation)
            .await
            .map_err(CardError::from_record)?;
        debug!(job_id = %id, "Observation updated");
        self.get(id).await
    }

    /// Loads a card with the bytes of every image.
    ///
    /// A blob that can't be read leaves its payload empty instead of failing
    /// the whole call.
    pub async fn get_with_images(&self, id: &str) -> Result<CardWithImages, CardError> {
        let card = self.get(id).await?;
        let engine = base64::engine::general_purpose::STANDARD;

        let mut image_data = Vec::with_capacity(card.images.len());
        for image in &card.images {
            let data = match self.backends.blobs.get(&image.storage_key).await {
                Ok(bytes) => Some(engine.encode(bytes)),
                Err(e) => {
                    warn!(
                        job_id = %card.id,
                        key = %sanitize::redact_key(&image.storage_key),
                        category = read_failure_category(&e),
                        "Could not load image: {}",
                        e
                    );
                    None
                }
            };
            image_data.push(ImagePayload {
                image: image.clone(),
                data,
            });
        }

        Ok(CardWithImages { card, image_data })
    }

    /// Issues a time-limited read URL for every image of a card.
    pub async fn image_urls(&self, id: &str, ttl: Duration) -> Result<Vec<ImageUrl>, CardError> {
        let card = self.get(id).await?;
        let mut urls = Vec::with_capacity(card.images.len());
        for image in card.images {
            let url = self
                .backends
                .blobs
                .presign_read(&image.storage_key, ttl)
                .await
                .map_err(|source| CardError::StorageReadFailed {
                    storage_key: image.storage_key.clone(),
                    source,
                })?;
            urls.push(ImageUrl {
                file_name: image.file_name,
                storage_key: image.storage_key,
                url,
            });
        }
        Ok(urls)
    }
}
