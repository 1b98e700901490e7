pub mod error;
pub mod fs;
pub mod memory;
pub mod store;

pub use error::BlobError;
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use store::{BlobDownload, BlobSink, BlobStore, DEFAULT_MAX_BLOB_BYTES};
