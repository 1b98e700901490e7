use async_trait::async_trait;
use chrono::{DateTime, Utc};

use muster_core::{Device, DeviceId};

use crate::error::RegistryError;

/// Single source of truth for device presence.
///
/// Implementations must be `Send + Sync` and safe for concurrent access;
/// every write is a single atomic upsert or update of one device record.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Touch a device because some ingestion activity referenced it.
    ///
    /// Unknown identifiers are created (`last_seen = at`, online); known
    /// ones get `last_seen` refreshed and are marked online. Timestamps
    /// are written as given — a stale request may move `last_seen`
    /// backward, matching the ingestion paths' existing behavior.
    async fn upsert_on_activity(
        &self,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Device, RegistryError>;

    /// Explicitly register a device, creating it if unknown. A provided
    /// label overwrites the stored one; `None` preserves it. Also
    /// refreshes `last_seen` and marks the device online.
    async fn register(
        &self,
        device: &DeviceId,
        label: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Device, RegistryError>;

    /// Refresh `last_seen`/online for an already-registered device.
    ///
    /// Unlike [`DeviceRegistry::upsert_on_activity`] this never creates:
    /// unknown identifiers fail with [`RegistryError::NotFound`].
    async fn heartbeat(
        &self,
        device: &DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Device, RegistryError>;

    /// Look up a single device.
    async fn get(&self, device: &DeviceId) -> Result<Option<Device>, RegistryError>;

    /// All known devices, most recently seen first.
    async fn list(&self) -> Result<Vec<Device>, RegistryError>;
}
