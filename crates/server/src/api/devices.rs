//! Device registration, heartbeat, and listing endpoints.

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;

use muster_core::{Device, DeviceId};

use crate::error::ApiError;

use super::AppState;
use super::schemas::{DeviceResponse, ErrorResponse, HeartbeatRequest, RegisterDeviceRequest};

fn require_device_id(id: Option<DeviceId>) -> Result<DeviceId, ApiError> {
    id.filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("deviceId required".to_owned()))
}

/// `POST /api/devices` -- register a device or update its label.
///
/// Creates the device if unknown; either way refreshes `lastSeen` and
/// marks it online.
#[utoipa::path(
    post,
    path = "/api/devices",
    tag = "Devices",
    request_body = RegisterDeviceRequest,
    responses(
        (status = 200, description = "Registered or updated", body = DeviceResponse),
        (status = 400, description = "Missing deviceId", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device_id = require_device_id(req.device_id)?;
    let device = state.registry.register(&device_id, req.label, Utc::now()).await?;
    Ok(Json(DeviceResponse { ok: true, device }))
}

/// `POST /api/devices/heartbeat` -- refresh presence for a registered
/// device. Unlike registration and the ingestion paths this never
/// creates: unknown devices get a 404.
#[utoipa::path(
    post,
    path = "/api/devices/heartbeat",
    tag = "Devices",
    request_body = HeartbeatRequest,
    responses(
        (status = 200, description = "Presence refreshed", body = DeviceResponse),
        (status = 400, description = "Missing deviceId", body = ErrorResponse),
        (status = 404, description = "Device was never registered", body = ErrorResponse)
    )
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(req): Json<HeartbeatRequest>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let device_id = require_device_id(req.device_id)?;
    let at = req.timestamp.unwrap_or_else(Utc::now);
    let device = state.registry.heartbeat(&device_id, at).await?;
    Ok(Json(DeviceResponse { ok: true, device }))
}

/// `GET /api/devices` -- all known devices, most recently seen first.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "Devices",
    responses(
        (status = 200, description = "Known devices", body = [Device])
    )
)]
pub async fn list_devices(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.registry.list().await?))
}

/// `GET /api/devices/{device_id}` -- a single device.
#[utoipa::path(
    get,
    path = "/api/devices/{device_id}",
    tag = "Devices",
    params(
        ("device_id" = String, Path, description = "Device identifier")
    ),
    responses(
        (status = 200, description = "The device", body = Device),
        (status = 404, description = "Unknown device", body = ErrorResponse)
    )
)]
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<DeviceId>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .registry
        .get(&device_id)
        .await?
        .ok_or(ApiError::NotFound("device"))?;
    Ok(Json(device))
}
