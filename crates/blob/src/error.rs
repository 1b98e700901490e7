use muster_core::BlobId;
use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob does not exist or was never committed.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// The declared payload size exceeds the configured ceiling.
    /// Rejected before any chunk is persisted.
    #[error("payload too large: {declared} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Declared size.
        declared: u64,
        /// Maximum allowed size.
        limit: u64,
    },

    /// The upload crossed the configured ceiling mid-stream and the
    /// partial blob was discarded.
    #[error("upload aborted after {written} bytes: limit is {limit} bytes")]
    UploadAborted {
        /// Bytes accepted before the upload was cut off.
        written: u64,
        /// Maximum allowed size.
        limit: u64,
    },

    /// An underlying I/O error.
    #[error("blob storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage backend is not ready.
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}
