use axum::Json;
use axum::response::IntoResponse;

use super::schemas::HealthResponse;

/// `GET /api/health` -- liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { ok: true })
}
