use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use muster_core::BlobId;

use crate::error::BlobError;

/// Default per-blob size ceiling: 200 MiB.
pub const DEFAULT_MAX_BLOB_BYTES: u64 = 200 * 1024 * 1024;

/// Streaming storage for large binary payloads, decoupled from the small
/// structured metadata records that reference them.
///
/// The write path is: [`BlobStore::begin_upload`] → any number of
/// [`BlobSink::write_chunk`] calls → [`BlobSink::commit`]. A blob becomes
/// visible to [`BlobStore::open_download`] atomically at commit; readers
/// can never observe a partial write.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Allocate a blob identifier and open a sink for sequential chunk
    /// writes. The identifier is reserved immediately but the blob is not
    /// readable until the sink is committed.
    async fn begin_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobSink>, BlobError>;

    /// Open a committed blob for streaming read.
    ///
    /// Fails with [`BlobError::NotFound`] for identifiers that were never
    /// committed, including aborted and still-in-flight uploads.
    async fn open_download(&self, id: &BlobId) -> Result<BlobDownload, BlobError>;

    /// The per-blob size ceiling enforced by this store's sinks.
    fn max_blob_bytes(&self) -> u64;
}

/// Write side of one in-flight blob upload.
///
/// Sinks accept chunks strictly in order. Exceeding the store's size
/// ceiling discards the partial blob and fails every subsequent call with
/// [`BlobError::UploadAborted`].
#[async_trait]
pub trait BlobSink: Send {
    /// The identifier reserved for this upload.
    fn id(&self) -> BlobId;

    /// Append a chunk to the blob.
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BlobError>;

    /// Finalize the blob, making it visible to readers atomically.
    /// Returns the total byte length written.
    async fn commit(self: Box<Self>) -> Result<u64, BlobError>;

    /// Discard the partially written blob. No metadata record may be
    /// created for an aborted upload.
    async fn abort(self: Box<Self>) -> Result<(), BlobError>;
}

/// A committed blob opened for reading.
pub struct BlobDownload {
    /// Total length in bytes.
    pub length: u64,
    /// Chunked byte stream from start to end. Dropping the stream early
    /// simply stops the read; downloads never write.
    pub stream: BoxStream<'static, Result<Bytes, BlobError>>,
}

impl std::fmt::Debug for BlobDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobDownload")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}
