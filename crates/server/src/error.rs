use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use muster_blob::BlobError;
use muster_registry::RegistryError;
use muster_store::StoreError;

/// Errors surfaced through the HTTP API.
///
/// Storage-layer detail never reaches external callers: unexpected
/// failures are logged here and collapsed to a generic internal-error
/// body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller's request is missing or malformed. No side effects.
    #[error("{0}")]
    InvalidArgument(String),

    /// The named resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A blob storage failure.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// A device registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidArgument(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::Blob(BlobError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "file not found".to_owned())
            }
            Self::Registry(RegistryError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "device not found".to_owned())
            }
            Self::Blob(
                e @ (BlobError::PayloadTooLarge { .. } | BlobError::UploadAborted { .. }),
            ) => (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()),
            Self::Blob(BlobError::Unavailable(_))
            | Self::Registry(RegistryError::Unavailable(_))
            | Self::Store(StoreError::Unavailable(_)) => {
                error!(error = %self, "storage backend unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "storage not ready".to_owned())
            }
            Self::Blob(BlobError::Io(_)) => {
                error!(error = %self, "internal error handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal".to_owned())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::{BlobId, DeviceId};

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            status_of(ApiError::InvalidArgument("deviceId required".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(ApiError::NotFound("device")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ApiError::Blob(BlobError::NotFound(BlobId::generate()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Registry(RegistryError::NotFound(DeviceId::from("d")))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Blob(BlobError::PayloadTooLarge {
                declared: 300,
                limit: 200,
            })),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(ApiError::Blob(BlobError::UploadAborted {
                written: 300,
                limit: 200,
            })),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(ApiError::Store(StoreError::Unavailable("warming up".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let err = ApiError::Blob(BlobError::Io(std::io::Error::other(
            "disk path /var/lib/muster/blobs is on fire",
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
