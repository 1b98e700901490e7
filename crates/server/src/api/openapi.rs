use axum::Json;
use axum::response::IntoResponse;
use utoipa::OpenApi;

use muster_core::{Device, LocationEvent, MediaKind, MediaRecord};

use super::schemas::{
    DeviceResponse, ErrorResponse, HealthResponse, HeartbeatRequest, LocationIngestRequest,
    LocationIngestResponse, RegisterDeviceRequest, UploadResponse,
};

/// Aggregated OpenAPI document for the Muster HTTP API.
///
/// The live WebSocket channel (`GET /api/live`) is not describable in
/// OpenAPI and is documented on the handler instead.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Muster API",
        version = "0.1.0",
        description = "Telemetry collection backend: device presence, media upload/download, and location ingestion with live fan-out.",
        license(name = "Apache-2.0")
    ),
    paths(
        super::health::health,
        super::devices::register,
        super::devices::heartbeat,
        super::devices::list_devices,
        super::devices::get_device,
        super::location::ingest,
        super::location::list_locations,
        super::media::upload,
        super::media::list_media,
        super::media::download,
    ),
    components(schemas(
        Device,
        MediaRecord,
        MediaKind,
        LocationEvent,
        DeviceResponse,
        ErrorResponse,
        HealthResponse,
        HeartbeatRequest,
        LocationIngestRequest,
        LocationIngestResponse,
        RegisterDeviceRequest,
        UploadResponse,
    )),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Devices", description = "Device registration and presence"),
        (name = "Location", description = "Position ingestion and history"),
        (name = "Media", description = "Binary upload, listing, and download")
    )
)]
pub struct ApiDoc;

/// `GET /api-doc/openapi.json` -- serve the OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
