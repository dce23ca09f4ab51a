//! Upload checks performed before a submission reaches the pipeline.

use crate::error::CardError;
use crate::model::RawImage;

/// A card has a front and at most a back.
pub const MAX_IMAGES: usize = 2;

/// Default per-image size cap (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Content types accepted for card images.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(content_type.trim()))
}

/// Checks only the image count.
pub fn validate_image_count(count: usize) -> Result<(), CardError> {
    if count == 0 {
        return Err(CardError::InvalidInput(
            "at least one image is required".to_string(),
        ));
    }
    if count > MAX_IMAGES {
        return Err(CardError::InvalidInput(format!(
            "at most {} images are allowed, got {}",
            MAX_IMAGES, count
        )));
    }
    Ok(())
}

/// Validates a batch of uploaded images.
///
/// Enforces the image count, the content type allow-list, non-empty payloads,
/// and `max_image_bytes` per image.
pub fn validate_upload(images: &[RawImage], max_image_bytes: u64) -> Result<(), CardError> {
    validate_image_count(images.len())?;

    for (index, image) in images.iter().enumerate() {
        if !is_allowed_content_type(&image.content_type) {
            return Err(CardError::InvalidInput(format!(
                "image {} ('{}') has unsupported content type '{}'; allowed: {}",
                index,
                image.file_name,
                image.content_type,
                ALLOWED_CONTENT_TYPES.join(", ")
            )));
        }
        if image.data.is_empty() {
            return Err(CardError::InvalidInput(format!(
                "image {} ('{}') is empty",
                index, image.file_name
            )));
        }
        if image.size_bytes() > max_image_bytes {
            return Err(CardError::InvalidInput(format!(
                "image {} ('{}') is {} bytes, limit is {}",
                index,
                image.file_name,
                image.size_bytes(),
                max_image_bytes
            )));
        }
    }
    Ok(())
}
