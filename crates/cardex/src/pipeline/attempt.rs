//! Extraction and final write, shared by first runs and retries.

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use crate::error::CardError;
use crate::extract::{Extraction, ExtractionError};
use crate::model::{BusinessCard, RawImage};

use super::outcome::Outcome;
use super::Backends;

/// Runs the extractor on `images` and stores the card as `Completed` or
/// `Failed`.
///
/// `card` must be in `Processing` or `Retrying`. Only the final write can
/// make this return `Err`; the unsaved card then rides along in
/// [`CardError::RecordStoreUnavailable`].
pub(crate) async fn extract_and_finalize(
    backends: &Backends,
    mut card: BusinessCard,
    images: &[RawImage],
) -> Result<Outcome, CardError> {
    let result = step_extract(backends, images)
        .instrument(info_span!("extract", image_count = images.len()))
        .await;

    let now = Utc::now();
    let failure = match result {
        Ok(extraction) => {
            card.complete(
                extraction.personal_data,
                extraction.company_data,
                extraction.raw_text,
                now,
            )
            .map_err(|e| CardError::invalid_transition(&card.id, e))?;
            None
        }
        Err(err) => {
            warn!(kind = %err.kind(), "Extraction failed: {}", err);
            card.fail(err.to_string(), err.kind(), now)
                .map_err(|e| CardError::invalid_transition(&card.id, e))?;
            Some(err)
        }
    };

    step_finalize(backends, card, failure)
        .instrument(info_span!("finalize"))
        .await
}

async fn step_extract(backends: &Backends, images: &[RawImage]) -> Result<Extraction, CardError> {
    let extraction = backends.extractor.extract(images).await?;

    // A card that yields nothing at all must not end up Completed.
    let empty = extraction.personal_data.is_empty() && extraction.company_data.is_empty();
    if empty {
        return Err(CardError::ExtractionUnparseable(
            ExtractionError::Unparseable {
                reason: "model output contains no card data".to_string(),
                raw: extraction.raw_text,
            },
        ));
    }
    Ok(extraction)
}

async fn step_finalize(
    backends: &Backends,
    card: BusinessCard,
    failure: Option<CardError>,
) -> Result<Outcome, CardError> {
    if let Err(e) = backends.records.put(&card).await {
        warn!(status = %card.status, "Final write failed: {}", e);
        return Err(CardError::unsaved(e, card));
    }

    info!(status = %card.status, retry_count = card.retry_count, "Card finalized");
    Ok(match failure {
        None => Outcome::completed(card),
        Some(err) => Outcome::failed(card, err),
    })
}
