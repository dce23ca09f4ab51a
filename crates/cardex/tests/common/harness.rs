//! Test harness for isolated pipeline runs.
//!
//! `TestHarness` wires a `CardService` over in-memory backends wrapped in
//! the fault-injecting fakes, and keeps handles to every layer so tests can
//! inspect what was written.

#![allow(dead_code)]

use std::sync::Arc;

use cardex::{
    BusinessCard, CardService, MemoryBlobStore, MemoryRecordStore, RawImage, RecordStore,
    Submission,
};

use super::fakes::{FlakyBlobStore, FlakyRecordStore, ScriptedExtractor};

pub struct TestHarness {
    pub blobs: Arc<FlakyBlobStore>,
    pub records: Arc<FlakyRecordStore>,
    pub extractor: Arc<ScriptedExtractor>,
    pub service: CardService,
}

impl TestHarness {
    /// Fault-free backends and the given extractor script.
    pub fn new(extractor: ScriptedExtractor) -> Self {
        Self::with_backends(
            FlakyBlobStore::new(Arc::new(MemoryBlobStore::new())),
            FlakyRecordStore::new(Arc::new(MemoryRecordStore::new())),
            extractor,
        )
    }

    pub fn with_backends(
        blobs: FlakyBlobStore,
        records: FlakyRecordStore,
        extractor: ScriptedExtractor,
    ) -> Self {
        let blobs = Arc::new(blobs);
        let records = Arc::new(records);
        let extractor = Arc::new(extractor);
        let service = CardService::new(blobs.clone(), extractor.clone(), records.clone());
        Self {
            blobs,
            records,
            extractor,
            service,
        }
    }

    /// Submits the images with no observation or user.
    pub async fn submit(&self, images: Vec<RawImage>) -> cardex::Result<cardex::Outcome> {
        self.service.submit(Submission::new(images)).await
    }

    /// Reads the record straight from the store, bypassing the service.
    pub async fn stored(&self, id: &str) -> BusinessCard {
        self.records.inner.get(id).await.expect("record should exist")
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.inner.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.inner.len()
    }
}
