use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use muster_core::{BlobId, Device, DeviceId, LocationEvent, MediaRecord};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable cause.
    #[schema(example = "deviceId required")]
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `true` when the service is up.
    pub ok: bool,
}

/// `POST /api/devices` request body.
///
/// Required fields are modeled as options so a missing `deviceId` can be
/// answered with a 400 and a useful message instead of a decode error.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    /// Device identifier. Required.
    pub device_id: Option<DeviceId>,
    /// Optional display label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// `POST /api/devices/heartbeat` request body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    /// Device identifier. Required.
    pub device_id: Option<DeviceId>,
    /// Heartbeat timestamp; defaults to the server clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Envelope returned by device registration and heartbeat.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponse {
    pub ok: bool,
    pub device: Device,
}

/// `POST /api/location` request body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationIngestRequest {
    /// Reporting device. Required.
    pub device_id: Option<DeviceId>,
    /// Latitude in degrees. Required.
    pub lat: Option<f64>,
    /// Longitude in degrees. Required.
    pub lon: Option<f64>,
    /// Reported accuracy in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Event timestamp (RFC 3339); defaults to the server clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Envelope returned by location ingestion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationIngestResponse {
    pub ok: bool,
    pub location: LocationEvent,
}

/// Envelope returned by a successful media upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub ok: bool,
    /// Identifier of the committed blob; pass to `GET /api/media/{blobId}`.
    pub file_id: BlobId,
    /// The persisted metadata record.
    pub meta: MediaRecord,
}

/// Device filter accepted by the listing endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeviceFilter {
    /// Restrict results to one device.
    pub device_id: Option<DeviceId>,
}
