//! In-memory [`BlobStore`] backend.
//!
//! Sinks buffer chunks locally and publish into a shared [`DashMap`] at
//! commit, so a partial upload is never observable. Used by tests and by
//! deployments that don't need durability.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use futures::StreamExt;
use tracing::debug;

use muster_core::BlobId;

use crate::error::BlobError;
use crate::store::{BlobDownload, BlobSink, BlobStore, DEFAULT_MAX_BLOB_BYTES};

/// Chunk size used when streaming a committed blob back out.
const DOWNLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// In-memory blob store backed by a [`DashMap`] of committed blobs.
#[derive(Debug)]
pub struct MemoryBlobStore {
    committed: Arc<DashMap<BlobId, Bytes>>,
    max_bytes: u64,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStore {
    /// Create a store with the default 200 MiB ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_bytes(DEFAULT_MAX_BLOB_BYTES)
    }

    /// Create a store with a custom per-blob ceiling.
    #[must_use]
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            committed: Arc::new(DashMap::new()),
            max_bytes,
        }
    }

    /// Number of committed blobs currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Returns `true` if no blobs have been committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn begin_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobSink>, BlobError> {
        let id = BlobId::generate();
        debug!(blob_id = %id, filename, content_type, "memory blob upload started");
        Ok(Box::new(MemorySink {
            id,
            buf: BytesMut::new(),
            aborted: false,
            committed: Arc::clone(&self.committed),
            max_bytes: self.max_bytes,
        }))
    }

    async fn open_download(&self, id: &BlobId) -> Result<BlobDownload, BlobError> {
        let bytes = self
            .committed
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(BlobError::NotFound(*id))?;

        let length = bytes.len() as u64;
        let mut chunks = Vec::with_capacity(bytes.len().div_ceil(DOWNLOAD_CHUNK_BYTES));
        let mut offset = 0;
        while offset < bytes.len() {
            let end = usize::min(offset + DOWNLOAD_CHUNK_BYTES, bytes.len());
            chunks.push(bytes.slice(offset..end));
            offset = end;
        }

        Ok(BlobDownload {
            length,
            stream: futures::stream::iter(chunks.into_iter().map(Ok)).boxed(),
        })
    }

    fn max_blob_bytes(&self) -> u64 {
        self.max_bytes
    }
}

struct MemorySink {
    id: BlobId,
    buf: BytesMut,
    aborted: bool,
    committed: Arc<DashMap<BlobId, Bytes>>,
    max_bytes: u64,
}

#[async_trait]
impl BlobSink for MemorySink {
    fn id(&self) -> BlobId {
        self.id
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BlobError> {
        if self.aborted {
            return Err(BlobError::UploadAborted {
                written: self.buf.len() as u64,
                limit: self.max_bytes,
            });
        }
        let would_be = self.buf.len() as u64 + chunk.len() as u64;
        if would_be > self.max_bytes {
            self.aborted = true;
            self.buf.clear();
            return Err(BlobError::UploadAborted {
                written: would_be,
                limit: self.max_bytes,
            });
        }
        self.buf.extend_from_slice(&chunk);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<u64, BlobError> {
        if self.aborted {
            return Err(BlobError::UploadAborted {
                written: 0,
                limit: self.max_bytes,
            });
        }
        let bytes = self.buf.freeze();
        let length = bytes.len() as u64;
        self.committed.insert(self.id, bytes);
        debug!(blob_id = %self.id, length, "memory blob committed");
        Ok(length)
    }

    async fn abort(self: Box<Self>) -> Result<(), BlobError> {
        debug!(blob_id = %self.id, "memory blob upload aborted");
        Ok(())
    }
}
