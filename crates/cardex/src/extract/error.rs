//! Extraction error types.

use thiserror::Error;

/// Errors from turning card images into structured data.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The extractor was called without any image.
    #[error("No images supplied for extraction")]
    NoImages,

    /// An image has a zero-length payload.
    #[error("Image {index} ('{file_name}') has no data")]
    EmptyImage { index: usize, file_name: String },

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// Network failure or timeout talking to the model service.
    #[error("Request to extraction service failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Extraction service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The service answered but produced no text.
    #[error("Extraction service returned no content")]
    EmptyResponse,

    /// The model produced text that doesn't hold the expected JSON object.
    #[error("{reason}")]
    Unparseable { reason: String, raw: String },

    /// Any other failure reported by the service.
    #[error("{0}")]
    Service(String),
}

impl ExtractionError {
    /// True when the service worked but its output couldn't be read.
    pub fn is_unparseable(&self) -> bool {
        matches!(self, ExtractionError::Unparseable { .. })
    }

    /// The raw model text, when the failure was about its content.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            ExtractionError::Unparseable { raw, .. } => Some(raw),
            _ => None,
        }
    }
}
