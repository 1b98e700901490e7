use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DeviceId;

/// A known client device and its presence state.
///
/// Devices are created on first registration or on the first ingestion
/// call referencing an unknown identifier, and are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique device identifier.
    pub device_id: DeviceId,
    /// Optional human-readable display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// When the device was last heard from.
    pub last_seen: DateTime<Utc>,
    /// Whether the device is currently considered online.
    pub online: bool,
    /// When the device record was created.
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// Create a fresh device record, online, first seen at `at`.
    #[must_use]
    pub fn new(device_id: DeviceId, at: DateTime<Utc>) -> Self {
        Self {
            device_id,
            label: None,
            last_seen: at,
            online: true,
            created_at: at,
        }
    }
}
