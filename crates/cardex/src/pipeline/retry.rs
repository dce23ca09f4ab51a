use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use crate::error::CardError;
use crate::model::{BusinessCard, JobStatus, RawImage};
use crate::sanitize;

use super::attempt::extract_and_finalize;
use super::outcome::Outcome;
use super::Backends;

/// Re-runs extraction for a `Failed` card using its stored images.
#[derive(Clone)]
pub struct RetryCoordinator {
    backends: Backends,
}

impl RetryCoordinator {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Retries the card with the given id.
    ///
    /// Fails with `NotFound`, `InvalidState` (card not `Failed`, or another
    /// retry claimed it first) or `StorageReadFailed` without changing the
    /// stored record.
    pub async fn retry(&self, id: &str) -> Result<Outcome, CardError> {
        let span = info_span!("retry_card", job_id = %id);

        async move {
            let card = self
                .backends
                .records
                .get(id)
                .await
                .map_err(CardError::from_record)?;

            if card.status != JobStatus::Failed {
                return Err(CardError::InvalidState {
                    id: id.to_string(),
                    from: card.status,
                    to: JobStatus::Retrying,
                });
            }

            let images = self
                .step_read_images(&card)
                .instrument(info_span!("read_images", image_count = card.images.len()))
                .await?;

            let card = self
                .step_claim(card)
                .instrument(info_span!("claim"))
                .await?;

            extract_and_finalize(&self.backends, card, &images).await
        }
        .instrument(span)
        .await
    }

    async fn step_read_images(&self, card: &BusinessCard) -> Result<Vec<RawImage>, CardError> {
        let mut images = Vec::with_capacity(card.images.len());
        for image in &card.images {
            let data = self
                .backends
                .blobs
                .get(&image.storage_key)
                .await
                .map_err(|source| {
                    warn!(
                        key = %sanitize::redact_key(&image.storage_key),
                        "Could not read stored image: {}",
                        source
                    );
                    CardError::StorageReadFailed {
                        storage_key: image.storage_key.clone(),
                        source,
                    }
                })?;
            images.push(RawImage::new(
                image.file_name.clone(),
                image.content_type.clone(),
                data,
            ));
        }
        Ok(images)
    }

    /// Moves the stored card from `Failed` to `Retrying` atomically, then
    /// records the attempt.
    async fn step_claim(&self, mut card: BusinessCard) -> Result<BusinessCard, CardError> {
        let claimed = self
            .backends
            .records
            .transition_status(&card.id, JobStatus::Failed, JobStatus::Retrying)
            .await
            .map_err(CardError::from_record)?;

        if !claimed {
            let current = match self.backends.records.get(&card.id).await {
                Ok(stored) => stored.status,
                Err(_) => JobStatus::Retrying,
            };
            info!(current = %current, "Retry lost the race for this card");
            return Err(CardError::InvalidState {
                id: card.id,
                from: current,
                to: JobStatus::Retrying,
            });
        }

        card.begin_retry(Utc::now())
            .map_err(|e| CardError::invalid_transition(&card.id, e))?;
        self.backends
            .records
            .put(&card)
            .await
            .map_err(CardError::from_record)?;

        info!(retry_count = card.retry_count, "Retry claimed");
        Ok(card)
    }
}
