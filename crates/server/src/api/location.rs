//! Location ingestion and listing.
//!
//! Ingestion is the one write path with live fan-out: the row is
//! persisted, published to the event bus for subscribed viewers, and the
//! device's presence is touched, in that order.

use axum::Json;
use axum::extract::{Query, State};
use chrono::Utc;
use tracing::debug;

use muster_core::{LiveEvent, LocationEvent};

use crate::error::ApiError;

use super::AppState;
use super::schemas::{DeviceFilter, ErrorResponse, LocationIngestRequest, LocationIngestResponse};

/// `POST /api/location` -- ingest a reported position.
#[utoipa::path(
    post,
    path = "/api/location",
    tag = "Location",
    request_body = LocationIngestRequest,
    responses(
        (status = 200, description = "Position stored and broadcast", body = LocationIngestResponse),
        (status = 400, description = "Missing deviceId or coordinates", body = ErrorResponse)
    )
)]
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<LocationIngestRequest>,
) -> Result<Json<LocationIngestResponse>, ApiError> {
    let device_id = req
        .device_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidArgument("deviceId required".to_owned()))?;
    let (Some(lat), Some(lon)) = (req.lat, req.lon) else {
        return Err(ApiError::InvalidArgument("lat and lon required".to_owned()));
    };

    let event = LocationEvent {
        device_id: device_id.clone(),
        lat,
        lon,
        accuracy: req.accuracy,
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
    };

    state.locations.insert(event.clone()).await?;

    let delivered = state
        .bus
        .publish(&device_id, &LiveEvent::Location(event.clone()));
    debug!(device = %device_id, delivered, "location published");

    state.registry.upsert_on_activity(&device_id, Utc::now()).await?;

    Ok(Json(LocationIngestResponse {
        ok: true,
        location: event,
    }))
}

/// `GET /api/location` -- recent positions, newest first, capped.
#[utoipa::path(
    get,
    path = "/api/location",
    tag = "Location",
    params(DeviceFilter),
    responses(
        (status = 200, description = "Recent positions", body = [LocationEvent])
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(filter): Query<DeviceFilter>,
) -> Result<Json<Vec<LocationEvent>>, ApiError> {
    Ok(Json(state.locations.list(filter.device_id.as_ref()).await?))
}
