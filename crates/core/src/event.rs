use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DeviceId;

/// A single reported device position.
///
/// Persisted by the location store and additionally broadcast live to
/// subscribed viewer sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LocationEvent {
    /// Reporting device.
    pub device_id: DeviceId,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Reported accuracy in meters, when the device provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// When the position was recorded.
    pub timestamp: DateTime<Utc>,
}

/// An event delivered live to viewer sessions subscribed to a device.
///
/// Wire shape is internally tagged:
/// `{"event":"location","deviceId":...,"lat":...,...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum LiveEvent {
    /// A live position update.
    Location(LocationEvent),
}

impl LiveEvent {
    /// The device this event is scoped to.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::Location(ev) => &ev.device_id,
        }
    }
}
