//! Structured data extraction from card images.

pub mod error;
pub mod gemini;
pub mod parse;
pub mod prompt;

use async_trait::async_trait;

use crate::model::{CompanyData, PersonalData, RawImage};

pub use error::ExtractionError;
pub use gemini::GeminiExtractor;
pub use parse::{locate_json_object, parse_extraction};

/// What an extractor read off the card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub personal_data: PersonalData,
    pub company_data: CompanyData,
    /// The model's answer, verbatim.
    pub raw_text: String,
}

/// Reads contact and company details from one or more card images.
///
/// Images are passed in submission order; implementations treat them as
/// views of the same card.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, images: &[RawImage]) -> Result<Extraction, ExtractionError>;
}

/// Rejects an empty batch or any zero-length image.
pub fn check_images(images: &[RawImage]) -> Result<(), ExtractionError> {
    if images.is_empty() {
        return Err(ExtractionError::NoImages);
    }
    if let Some((index, image)) = images.iter().enumerate().find(|(_, i)| i.data.is_empty()) {
        return Err(ExtractionError::EmptyImage {
            index,
            file_name: image.file_name.clone(),
        });
    }
    Ok(())
}
