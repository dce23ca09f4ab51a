use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::CardError;
use crate::model::{BusinessCard, ImageRef, RawImage, Submission};
use crate::sanitize;
use crate::validate::validate_image_count;

use super::attempt::extract_and_finalize;
use super::outcome::Outcome;
use super::Backends;

/// Drives a new submission from raw images to a finalized record.
#[derive(Clone)]
pub struct CardPipeline {
    backends: Backends,
}

impl CardPipeline {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Uploads the images, records the card and runs the first extraction.
    ///
    /// Returns `Err` only when nothing usable was stored or the final write
    /// failed. An extraction failure comes back as `Ok` with
    /// [`Outcome::failure`] set.
    pub async fn submit(&self, submission: Submission) -> Result<Outcome, CardError> {
        validate_image_count(submission.images.len())?;

        let id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("submit_card",
            job_id = %id,
            image_count = submission.images.len(),
        );

        async move {
            let Submission {
                images,
                observation,
                user,
            } = submission;

            let refs = self
                .step_upload_images(&id, &images)
                .instrument(info_span!("upload_images"))
                .await?;

            let mut card = BusinessCard::new(id, refs, observation, user, Utc::now());
            self.step_persist_pending(&card)
                .instrument(info_span!("persist_pending"))
                .await?;

            self.step_start_processing(&mut card)
                .instrument(info_span!("start_processing"))
                .await?;

            extract_and_finalize(&self.backends, card, &images).await
        }
        .instrument(span)
        .await
    }

    /// Writes every image under the card's scope. Any failure removes what
    /// was already written.
    async fn step_upload_images(
        &self,
        id: &str,
        images: &[RawImage],
    ) -> Result<Vec<ImageRef>, CardError> {
        let mut refs = Vec::with_capacity(images.len());

        for image in images {
            let stored = self
                .backends
                .blobs
                .put(id, &image.file_name, &image.content_type, &image.data)
                .await;

            match stored {
                Ok(storage_key) => {
                    debug!(
                        key = %sanitize::redact_key(&storage_key),
                        size_bytes = image.size_bytes(),
                        "Stored image"
                    );
                    refs.push(ImageRef {
                        file_name: image.file_name.clone(),
                        content_type: image.content_type.clone(),
                        size_bytes: image.size_bytes(),
                        storage_key,
                        uploaded_at: Utc::now(),
                    });
                }
                Err(source) => {
                    warn!(
                        file_name = %sanitize::redact_key(&image.file_name),
                        "Image upload failed: {}",
                        source
                    );
                    self.compensate(id).await;
                    return Err(CardError::StorageWriteFailed {
                        file_name: image.file_name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(refs)
    }

    async fn step_persist_pending(&self, card: &BusinessCard) -> Result<(), CardError> {
        if let Err(e) = self.backends.records.put(card).await {
            warn!("Could not record new card: {}", e);
            // No record means nobody owns the blobs.
            self.compensate(&card.id).await;
            return Err(CardError::from_record(e));
        }
        Ok(())
    }

    async fn step_start_processing(&self, card: &mut BusinessCard) -> Result<(), CardError> {
        card.start_processing()
            .map_err(|e| CardError::invalid_transition(&card.id, e))?;
        self.backends
            .records
            .put(card)
            .await
            .map_err(CardError::from_record)
    }

    /// Best-effort removal of every blob stored for `id`.
    async fn compensate(&self, id: &str) {
        match self.backends.blobs.delete_prefix(id).await {
            Ok(()) => info!("Removed images of abandoned submission"),
            Err(e) => warn!("Failed to remove images of abandoned submission: {}", e),
        }
    }
}
