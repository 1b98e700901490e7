use async_trait::async_trait;

use muster_core::{BlobId, DeviceId, LocationEvent, MediaRecord, RecordId};

use crate::error::StoreError;

/// Fixed listing cap for media metadata queries.
pub const MEDIA_LIST_CAP: usize = 200;

/// Fixed listing cap for location queries.
pub const LOCATION_LIST_CAP: usize = 500;

/// Persistence for media metadata records.
///
/// Records are only ever inserted after their referenced blob has been
/// committed, so every record a listing returns points at readable bytes.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist a new record.
    async fn insert(&self, record: MediaRecord) -> Result<(), StoreError>;

    /// Look up a record by its identifier.
    async fn get(&self, id: &RecordId) -> Result<Option<MediaRecord>, StoreError>;

    /// Look up the record referencing a given blob, if any.
    async fn find_by_blob(&self, blob: &BlobId) -> Result<Option<MediaRecord>, StoreError>;

    /// List records, newest first, optionally filtered by owning device,
    /// capped at [`MEDIA_LIST_CAP`].
    async fn list(&self, device: Option<&DeviceId>) -> Result<Vec<MediaRecord>, StoreError>;
}

/// Persistence for reported device positions.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Persist a reported position.
    async fn insert(&self, event: LocationEvent) -> Result<(), StoreError>;

    /// List positions, newest first by event timestamp, optionally
    /// filtered by device, capped at [`LOCATION_LIST_CAP`].
    async fn list(&self, device: Option<&DeviceId>) -> Result<Vec<LocationEvent>, StoreError>;
}
