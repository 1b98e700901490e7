pub mod devices;
pub mod health;
pub mod live;
pub mod location;
pub mod media;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use muster_blob::BlobStore;
use muster_bus::EventBus;
use muster_registry::DeviceRegistry;
use muster_store::{LocationStore, MediaStore};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Device presence registry.
    pub registry: Arc<dyn DeviceRegistry>,
    /// Binary payload storage.
    pub blobs: Arc<dyn BlobStore>,
    /// Media metadata records.
    pub media: Arc<dyn MediaStore>,
    /// Reported position records.
    pub locations: Arc<dyn LocationStore>,
    /// Live event fan-out to viewer sessions.
    pub bus: Arc<EventBus>,
    /// Per-file upload ceiling, mirrored from the blob store config.
    pub max_upload_bytes: u64,
}

/// Build the Axum router with all API routes and middleware.
pub fn router(state: AppState) -> Router {
    // Give the multipart framing and sibling fields some headroom above
    // the per-file ceiling; the blob sink enforces the exact file cap.
    let body_limit = usize::try_from(state.max_upload_bytes.saturating_add(1024 * 1024))
        .unwrap_or(usize::MAX);

    Router::new()
        // Health
        .route("/api/health", get(health::health))
        // Devices
        .route(
            "/api/devices",
            get(devices::list_devices).post(devices::register),
        )
        .route("/api/devices/heartbeat", post(devices::heartbeat))
        .route("/api/devices/{device_id}", get(devices::get_device))
        // Location ingestion & listing
        .route(
            "/api/location",
            get(location::list_locations).post(location::ingest),
        )
        // Media upload / listing / download
        .route(
            "/api/media/upload",
            post(media::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/media", get(media::list_media))
        .route("/api/media/{blob_id}", get(media::download))
        // Live viewer channel
        .route("/api/live", get(live::live))
        // OpenAPI document
        .route("/api-doc/openapi.json", get(openapi::openapi_json))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
