use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;

use muster_core::{BlobId, DeviceId, LocationEvent, MediaRecord, RecordId};

use crate::error::StoreError;
use crate::store::{LOCATION_LIST_CAP, LocationStore, MEDIA_LIST_CAP, MediaStore};

/// In-memory [`MediaStore`] backed by a [`DashMap`] keyed by record id.
#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    records: DashMap<RecordId, MediaRecord>,
}

impl MemoryMediaStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn insert(&self, record: MediaRecord) -> Result<(), StoreError> {
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn get(&self, id: &RecordId) -> Result<Option<MediaRecord>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.clone()))
    }

    async fn find_by_blob(&self, blob: &BlobId) -> Result<Option<MediaRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|entry| entry.blob_id == *blob)
            .map(|entry| entry.clone()))
    }

    async fn list(&self, device: Option<&DeviceId>) -> Result<Vec<MediaRecord>, StoreError> {
        let mut records: Vec<MediaRecord> = self
            .records
            .iter()
            .filter(|entry| device.is_none_or(|dev| entry.device_id == *dev))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(MEDIA_LIST_CAP);
        Ok(records)
    }
}

/// In-memory [`LocationStore`]. Positions are an append-only log; a
/// single mutex-guarded vector is plenty at the capped read sizes.
#[derive(Debug, Default)]
pub struct MemoryLocationStore {
    events: Mutex<Vec<LocationEvent>>,
}

impl MemoryLocationStore {
    /// Create a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LocationEvent>> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn insert(&self, event: LocationEvent) -> Result<(), StoreError> {
        self.lock().push(event);
        Ok(())
    }

    async fn list(&self, device: Option<&DeviceId>) -> Result<Vec<LocationEvent>, StoreError> {
        let mut events: Vec<LocationEvent> = self
            .lock()
            .iter()
            .filter(|ev| device.is_none_or(|dev| ev.device_id == *dev))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(LOCATION_LIST_CAP);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use muster_core::MediaKind;

    fn media(device: &str, offset_secs: i64) -> MediaRecord {
        MediaRecord {
            id: RecordId::generate(),
            device_id: DeviceId::from(device),
            filename: "f.jpg".into(),
            content_type: "image/jpeg".into(),
            length: 10,
            blob_id: BlobId::generate(),
            kind: MediaKind::Photo,
            metadata: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn position(device: &str, offset_secs: i64) -> LocationEvent {
        LocationEvent {
            device_id: DeviceId::from(device),
            lat: 1.0,
            lon: 2.0,
            accuracy: None,
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn media_listing_filters_by_device_newest_first() {
        let store = MemoryMediaStore::new();
        store.insert(media("d1", 0)).await.unwrap();
        store.insert(media("d2", 1)).await.unwrap();
        store.insert(media("d1", 2)).await.unwrap();

        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].created_at >= all[1].created_at);

        let d1 = store.list(Some(&DeviceId::from("d1"))).await.unwrap();
        assert_eq!(d1.len(), 2);
        assert!(d1.iter().all(|r| r.device_id.as_str() == "d1"));
        assert!(d1[0].created_at > d1[1].created_at);
    }

    #[tokio::test]
    async fn media_lookup_by_blob() {
        let store = MemoryMediaStore::new();
        let record = media("d1", 0);
        let blob = record.blob_id;
        let id = record.id;
        store.insert(record).await.unwrap();

        assert_eq!(store.find_by_blob(&blob).await.unwrap().unwrap().id, id);
        assert!(store.find_by_blob(&BlobId::generate()).await.unwrap().is_none());
        assert!(store.get(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn media_listing_is_capped() {
        let store = MemoryMediaStore::new();
        for i in 0..(MEDIA_LIST_CAP as i64 + 20) {
            store.insert(media("d1", i)).await.unwrap();
        }
        assert_eq!(store.list(None).await.unwrap().len(), MEDIA_LIST_CAP);
    }

    #[tokio::test]
    async fn location_listing_orders_by_event_timestamp() {
        let store = MemoryLocationStore::new();
        // Inserted out of order on purpose.
        store.insert(position("d1", 5)).await.unwrap();
        store.insert(position("d1", 20)).await.unwrap();
        store.insert(position("d1", 10)).await.unwrap();
        store.insert(position("d2", 30)).await.unwrap();

        let d1 = store.list(Some(&DeviceId::from("d1"))).await.unwrap();
        assert_eq!(d1.len(), 3);
        assert!(d1[0].timestamp > d1[1].timestamp);
        assert!(d1[1].timestamp > d1[2].timestamp);
    }

    #[tokio::test]
    async fn location_listing_is_capped() {
        let store = MemoryLocationStore::new();
        for i in 0..(LOCATION_LIST_CAP as i64 + 50) {
            store.insert(position("d1", i)).await.unwrap();
        }
        assert_eq!(store.list(None).await.unwrap().len(), LOCATION_LIST_CAP);
    }
}
