use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use muster_core::{Device, DeviceId};

use crate::error::RegistryError;
use crate::registry::DeviceRegistry;

/// In-memory [`DeviceRegistry`] backed by a [`DashMap`].
///
/// The create-or-update paths go through the map's entry API so the
/// "exactly one record per device identifier" invariant holds under
/// concurrent ingestion.
#[derive(Debug, Default)]
pub struct MemoryDeviceRegistry {
    devices: DashMap<DeviceId, Device>,
}

impl MemoryDeviceRegistry {
    /// Create a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn upsert_on_activity(
        &self,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Device, RegistryError> {
        let entry = self
            .devices
            .entry(device.clone())
            .and_modify(|dev| {
                dev.last_seen = at;
                dev.online = true;
            })
            .or_insert_with(|| Device::new(device.clone(), at));
        Ok(entry.clone())
    }

    async fn register(
        &self,
        device: &DeviceId,
        label: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Device, RegistryError> {
        let entry = self
            .devices
            .entry(device.clone())
            .and_modify(|dev| {
                if let Some(ref new_label) = label {
                    dev.label = Some(new_label.clone());
                }
                dev.last_seen = at;
                dev.online = true;
            })
            .or_insert_with(|| {
                let mut dev = Device::new(device.clone(), at);
                dev.label = label.clone();
                dev
            });
        Ok(entry.clone())
    }

    async fn heartbeat(
        &self,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Device, RegistryError> {
        let mut entry = self
            .devices
            .get_mut(device)
            .ok_or_else(|| RegistryError::NotFound(device.clone()))?;
        entry.last_seen = at;
        entry.online = true;
        Ok(entry.clone())
    }

    async fn get(&self, device: &DeviceId) -> Result<Option<Device>, RegistryError> {
        Ok(self.devices.get(device).map(|entry| entry.clone()))
    }

    async fn list(&self) -> Result<Vec<Device>, RegistryError> {
        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        devices.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn upsert_creates_unknown_devices() {
        let registry = MemoryDeviceRegistry::new();
        let now = Utc::now();
        let dev = registry
            .upsert_on_activity(&DeviceId::from("d1"), now)
            .await
            .unwrap();

        assert_eq!(dev.device_id.as_str(), "d1");
        assert_eq!(dev.last_seen, now);
        assert_eq!(dev.created_at, now);
        assert!(dev.online);
    }

    #[tokio::test]
    async fn upsert_refreshes_known_devices_without_duplicating() {
        let registry = MemoryDeviceRegistry::new();
        let id = DeviceId::from("d1");
        let first = Utc::now();
        let later = first + Duration::seconds(30);

        registry.upsert_on_activity(&id, first).await.unwrap();
        let dev = registry.upsert_on_activity(&id, later).await.unwrap();

        assert_eq!(dev.last_seen, later);
        assert_eq!(dev.created_at, first);
        assert_eq!(registry.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn heartbeat_for_unknown_device_fails_and_creates_nothing() {
        let registry = MemoryDeviceRegistry::new();
        let id = DeviceId::from("ghost");

        let err = registry.heartbeat(&id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
        assert!(registry.get(&id).await.unwrap().is_none());
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn heartbeat_refreshes_registered_devices() {
        let registry = MemoryDeviceRegistry::new();
        let id = DeviceId::from("d1");
        let first = Utc::now();
        registry.register(&id, None, first).await.unwrap();

        let later = first + Duration::seconds(60);
        let dev = registry.heartbeat(&id, later).await.unwrap();
        assert_eq!(dev.last_seen, later);
        assert!(dev.online);
    }

    #[tokio::test]
    async fn register_overwrites_label_only_when_provided() {
        let registry = MemoryDeviceRegistry::new();
        let id = DeviceId::from("d1");
        let now = Utc::now();

        let dev = registry
            .register(&id, Some("kitchen tablet".into()), now)
            .await
            .unwrap();
        assert_eq!(dev.label.as_deref(), Some("kitchen tablet"));

        let dev = registry.register(&id, None, now).await.unwrap();
        assert_eq!(dev.label.as_deref(), Some("kitchen tablet"));

        let dev = registry
            .register(&id, Some("hall tablet".into()), now)
            .await
            .unwrap();
        assert_eq!(dev.label.as_deref(), Some("hall tablet"));
    }

    #[tokio::test]
    async fn stale_timestamps_are_written_as_given() {
        let registry = MemoryDeviceRegistry::new();
        let id = DeviceId::from("d1");
        let now = Utc::now();
        registry.upsert_on_activity(&id, now).await.unwrap();

        let stale = now - Duration::minutes(5);
        let dev = registry.upsert_on_activity(&id, stale).await.unwrap();
        assert_eq!(dev.last_seen, stale);
    }

    #[tokio::test]
    async fn list_is_most_recently_seen_first() {
        let registry = MemoryDeviceRegistry::new();
        let base = Utc::now();
        registry
            .upsert_on_activity(&DeviceId::from("old"), base)
            .await
            .unwrap();
        registry
            .upsert_on_activity(&DeviceId::from("new"), base + Duration::seconds(10))
            .await
            .unwrap();
        registry
            .upsert_on_activity(&DeviceId::from("mid"), base + Duration::seconds(5))
            .await
            .unwrap();

        let ids: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.device_id.to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }
}
