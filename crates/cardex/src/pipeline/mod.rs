//! Card processing: first submission and retries.

mod attempt;
pub mod outcome;
pub mod retry;
pub mod runner;

use std::sync::Arc;

use crate::extract::Extractor;
use crate::records::RecordStore;
use crate::storage::BlobStore;

pub use outcome::Outcome;
pub use retry::RetryCoordinator;
pub use runner::CardPipeline;

/// The three backends every processing step talks to.
#[derive(Clone)]
pub struct Backends {
    pub blobs: Arc<dyn BlobStore>,
    pub extractor: Arc<dyn Extractor>,
    pub records: Arc<dyn RecordStore>,
}

impl Backends {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn Extractor>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            blobs,
            extractor,
            records,
        }
    }
}
