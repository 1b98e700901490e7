//! Filesystem [`BlobStore`] backend.
//!
//! Each upload streams into a private file under `<root>/staging/`;
//! [`BlobSink::commit`] fsyncs and renames it into `<root>/blobs/`. The
//! rename is the atomic visibility flip: readers only ever open fully
//! written files. Staging leftovers from a crashed process are swept on
//! [`FsBlobStore::open`] — they were never visible to begin with.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use muster_core::BlobId;

use crate::error::BlobError;
use crate::store::{BlobDownload, BlobSink, BlobStore, DEFAULT_MAX_BLOB_BYTES};

/// Read buffer size for download streaming.
const READ_CHUNK_BYTES: usize = 64 * 1024;

/// Durable blob store keeping one file per committed blob.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    max_bytes: u64,
}

impl FsBlobStore {
    /// Open (or create) a blob store rooted at `root` with the default
    /// 200 MiB ceiling.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BlobError> {
        Self::open_with_max_bytes(root, DEFAULT_MAX_BLOB_BYTES).await
    }

    /// Open (or create) a blob store with a custom per-blob ceiling.
    pub async fn open_with_max_bytes(
        root: impl Into<PathBuf>,
        max_bytes: u64,
    ) -> Result<Self, BlobError> {
        let root = root.into();
        fs::create_dir_all(root.join("blobs")).await?;
        fs::create_dir_all(root.join("staging")).await?;

        let store = Self { root, max_bytes };
        store.sweep_staging().await;
        Ok(store)
    }

    fn blob_path(&self, id: &BlobId) -> PathBuf {
        self.root.join("blobs").join(id.to_string())
    }

    fn staging_path(&self, id: &BlobId) -> PathBuf {
        self.root.join("staging").join(id.to_string())
    }

    /// Remove staging files left behind by uploads that never committed
    /// (process crash mid-upload). Removal failures are logged, not fatal.
    async fn sweep_staging(&self) {
        let staging = self.root.join("staging");
        let Ok(mut entries) = fs::read_dir(&staging).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "swept stale staging file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to sweep staging file"),
            }
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn begin_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<Box<dyn BlobSink>, BlobError> {
        let id = BlobId::generate();
        let staging = self.staging_path(&id);
        let file = fs::File::create(&staging).await?;
        debug!(blob_id = %id, filename, content_type, "fs blob upload started");

        Ok(Box::new(FsSink {
            id,
            file: Some(file),
            staging,
            dest: self.blob_path(&id),
            written: 0,
            max_bytes: self.max_bytes,
        }))
    }

    async fn open_download(&self, id: &BlobId) -> Result<BlobDownload, BlobError> {
        let path = self.blob_path(id);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(*id));
            }
            Err(e) => return Err(BlobError::Io(e)),
        };
        let length = file.metadata().await?.len();

        let stream = ReaderStream::with_capacity(file, READ_CHUNK_BYTES)
            .map(|chunk| chunk.map_err(BlobError::from))
            .boxed();

        Ok(BlobDownload { length, stream })
    }

    fn max_blob_bytes(&self) -> u64 {
        self.max_bytes
    }
}

struct FsSink {
    id: BlobId,
    file: Option<fs::File>,
    staging: PathBuf,
    dest: PathBuf,
    written: u64,
    max_bytes: u64,
}

impl FsSink {
    /// Drop the file handle and unlink the staging file.
    async fn discard(&mut self) {
        self.file.take();
        if let Err(e) = remove_if_present(&self.staging).await {
            warn!(path = %self.staging.display(), error = %e, "failed to remove staging file");
        }
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl BlobSink for FsSink {
    fn id(&self) -> BlobId {
        self.id
    }

    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), BlobError> {
        let Some(file) = self.file.as_mut() else {
            return Err(BlobError::UploadAborted {
                written: self.written,
                limit: self.max_bytes,
            });
        };

        let would_be = self.written + chunk.len() as u64;
        if would_be > self.max_bytes {
            self.discard().await;
            return Err(BlobError::UploadAborted {
                written: would_be,
                limit: self.max_bytes,
            });
        }

        file.write_all(&chunk).await?;
        self.written = would_be;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<u64, BlobError> {
        let Some(mut file) = self.file.take() else {
            return Err(BlobError::UploadAborted {
                written: self.written,
                limit: self.max_bytes,
            });
        };

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&self.staging, &self.dest).await?;
        debug!(blob_id = %self.id, length = self.written, "fs blob committed");
        Ok(self.written)
    }

    async fn abort(mut self: Box<Self>) -> Result<(), BlobError> {
        self.discard().await;
        debug!(blob_id = %self.id, "fs blob upload aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(download: BlobDownload) -> Vec<u8> {
        let mut out = Vec::new();
        let mut stream = download.stream;
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn roundtrip_through_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        let mut sink = store.begin_upload("clip.mp4", "video/mp4").await.unwrap();
        let id = sink.id();
        let payload: Vec<u8> = (0..1024 * 1024).map(|i| (i % 233) as u8).collect();
        for chunk in payload.chunks(64 * 1024) {
            sink.write_chunk(Bytes::copy_from_slice(chunk)).await.unwrap();
        }
        let len = sink.commit().await.unwrap();
        assert_eq!(len, payload.len() as u64);

        let download = store.open_download(&id).await.unwrap();
        assert_eq!(download.length, payload.len() as u64);
        assert_eq!(read_all(download).await, payload);
    }

    #[tokio::test]
    async fn blob_is_invisible_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        let mut sink = store.begin_upload("a", "text/plain").await.unwrap();
        let id = sink.id();
        sink.write_chunk(Bytes::from_static(b"staged")).await.unwrap();

        assert!(matches!(
            store.open_download(&id).await,
            Err(BlobError::NotFound(_))
        ));

        sink.commit().await.unwrap();
        assert!(store.open_download(&id).await.is_ok());
    }

    #[tokio::test]
    async fn abort_unlinks_the_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).await.unwrap();

        let mut sink = store.begin_upload("a", "text/plain").await.unwrap();
        let id = sink.id();
        sink.write_chunk(Bytes::from_static(b"doomed")).await.unwrap();
        sink.abort().await.unwrap();

        assert!(matches!(
            store.open_download(&id).await,
            Err(BlobError::NotFound(_))
        ));
        let staging = dir.path().join("staging").join(id.to_string());
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn ceiling_overflow_discards_and_poisons_the_sink() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open_with_max_bytes(dir.path(), 8).await.unwrap();

        let mut sink = store.begin_upload("big", "application/octet-stream").await.unwrap();
        let id = sink.id();
        sink.write_chunk(Bytes::from_static(b"12345")).await.unwrap();

        let err = sink.write_chunk(Bytes::from_static(b"6789")).await.unwrap_err();
        assert!(matches!(err, BlobError::UploadAborted { written: 9, limit: 8 }));
        assert!(sink.commit().await.is_err());

        assert!(matches!(
            store.open_download(&id).await,
            Err(BlobError::NotFound(_))
        ));
        assert!(!dir.path().join("staging").join(id.to_string()).exists());
    }

    #[tokio::test]
    async fn reopening_sweeps_stale_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsBlobStore::open(dir.path()).await.unwrap();
            let mut sink = store.begin_upload("a", "text/plain").await.unwrap();
            sink.write_chunk(Bytes::from_static(b"orphaned")).await.unwrap();
            // Neither committed nor aborted: simulates a crash mid-upload.
            drop(sink);
        }

        let _store = FsBlobStore::open(dir.path()).await.unwrap();
        let mut staged = std::fs::read_dir(dir.path().join("staging")).unwrap();
        assert!(staged.next().is_none());
    }

    #[tokio::test]
    async fn committed_blobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FsBlobStore::open(dir.path()).await.unwrap();
            let mut sink = store.begin_upload("keep", "text/plain").await.unwrap();
            sink.write_chunk(Bytes::from_static(b"durable")).await.unwrap();
            let id = sink.id();
            sink.commit().await.unwrap();
            id
        };

        let store = FsBlobStore::open(dir.path()).await.unwrap();
        let download = store.open_download(&id).await.unwrap();
        assert_eq!(read_all(download).await, b"durable");
    }
}
