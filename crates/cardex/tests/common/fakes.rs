//! Backends with scripted behavior and injectable faults.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use cardex::records::RecordError;
use cardex::storage::PresignedUrl;
use cardex::{
    BlobStore, BusinessCard, Extraction, ExtractionError, Extractor, JobStatus, MemoryBlobStore,
    MemoryRecordStore, RawImage, RecordStore, StorageError,
};

/// Holds one extractor call open until the test releases it.
#[derive(Default)]
pub struct CallGate {
    entered: Notify,
    release: Notify,
}

impl CallGate {
    /// Resolves once the gated call has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Extractor that replays a queue of canned results.
///
/// Running out of script is reported as a service error.
#[derive(Default)]
pub struct ScriptedExtractor {
    script: Mutex<VecDeque<Result<Extraction, ExtractionError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<String>>>,
    gate: Option<(usize, Arc<CallGate>)>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, extraction: Extraction) -> Self {
        self.push(Ok(extraction));
        self
    }

    pub fn then_err(self, err: ExtractionError) -> Self {
        self.push(Err(err));
        self
    }

    /// Parks the n-th call (1-based) on the returned gate.
    pub fn gate_call(mut self, n: usize) -> (Self, Arc<CallGate>) {
        let gate = Arc::new(CallGate::default());
        self.gate = Some((n, gate.clone()));
        (self, gate)
    }

    pub fn push(&self, result: Result<Extraction, ExtractionError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// File names of the images passed to each call, in order.
    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, images: &[RawImage]) -> Result<Extraction, ExtractionError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((gated, gate)) = &self.gate {
            if *gated == n {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        self.seen
            .lock()
            .unwrap()
            .push(images.iter().map(|i| i.file_name.clone()).collect());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExtractionError::Service("script exhausted".to_string())))
    }
}

/// Network-style failure as the HTTP extractor would report it.
pub fn network_error() -> ExtractionError {
    ExtractionError::Api {
        status: 503,
        body: "upstream unavailable".to_string(),
    }
}

pub fn unparseable_error() -> ExtractionError {
    ExtractionError::Unparseable {
        reason: "no JSON object in model output".to_string(),
        raw: "I could not read this card".to_string(),
    }
}

/// Blob store over `MemoryBlobStore` that can fail the n-th put (1-based)
/// and every get.
pub struct FlakyBlobStore {
    pub inner: Arc<MemoryBlobStore>,
    fail_put_at: Option<usize>,
    fail_gets: bool,
    puts: AtomicUsize,
    deleted_scopes: Mutex<Vec<String>>,
}

impl FlakyBlobStore {
    pub fn new(inner: Arc<MemoryBlobStore>) -> Self {
        Self {
            inner,
            fail_put_at: None,
            fail_gets: false,
            puts: AtomicUsize::new(0),
            deleted_scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_put_at(mut self, n: usize) -> Self {
        self.fail_put_at = Some(n);
        self
    }

    pub fn fail_gets(mut self) -> Self {
        self.fail_gets = true;
        self
    }

    pub fn deleted_scopes(&self) -> Vec<String> {
        self.deleted_scopes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(
        &self,
        owner_scope: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_put_at == Some(n) {
            return Err(StorageError::Unavailable(format!("put #{} rejected", n)));
        }
        self.inner.put(owner_scope, file_name, content_type, data).await
    }

    /// Yields once before reading so concurrent callers interleave.
    async fn get(&self, storage_key: &str) -> Result<Vec<u8>, StorageError> {
        tokio::task::yield_now().await;
        if self.fail_gets {
            return Err(StorageError::Unavailable("reads disabled".to_string()));
        }
        self.inner.get(storage_key).await
    }

    async fn delete_prefix(&self, owner_scope: &str) -> Result<(), StorageError> {
        self.deleted_scopes
            .lock()
            .unwrap()
            .push(owner_scope.to_string());
        self.inner.delete_prefix(owner_scope).await
    }

    async fn presign_read(
        &self,
        storage_key: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        self.inner.presign_read(storage_key, ttl).await
    }
}

/// Record store over `MemoryRecordStore` that can fail the n-th put
/// (1-based).
pub struct FlakyRecordStore {
    pub inner: Arc<MemoryRecordStore>,
    fail_put_at: Option<usize>,
    puts: AtomicUsize,
    history: Mutex<Vec<(String, JobStatus)>>,
}

impl FlakyRecordStore {
    pub fn new(inner: Arc<MemoryRecordStore>) -> Self {
        Self {
            inner,
            fail_put_at: None,
            puts: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_put_at(mut self, n: usize) -> Self {
        self.fail_put_at = Some(n);
        self
    }

    /// Every status written for `id`, in write order.
    pub fn statuses_of(&self, id: &str) -> Vec<JobStatus> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(written, _)| written == id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn put(&self, card: &BusinessCard) -> Result<(), RecordError> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_put_at == Some(n) {
            return Err(RecordError::Unavailable(format!("put #{} rejected", n)));
        }
        self.inner.put(card).await?;
        self.history
            .lock()
            .unwrap()
            .push((card.id.clone(), card.status));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<BusinessCard, RecordError> {
        self.inner.get(id).await
    }

    async fn scan(&self) -> Result<Vec<BusinessCard>, RecordError> {
        self.inner.scan().await
    }

    async fn scan_by_status(&self, status: JobStatus) -> Result<Vec<BusinessCard>, RecordError> {
        self.inner.scan_by_status(status).await
    }

    async fn transition_status(
        &self,
        id: &str,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<bool, RecordError> {
        let changed = self.inner.transition_status(id, from, to).await?;
        if changed {
            self.history.lock().unwrap().push((id.to_string(), to));
        }
        Ok(changed)
    }

    async fn set_observation(&self, id: &str, observation: &str) -> Result<(), RecordError> {
        self.inner.set_observation(id, observation).await
    }
}
