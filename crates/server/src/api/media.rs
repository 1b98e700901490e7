//! Media upload, listing, and download.
//!
//! Upload streams the file part chunk-by-chunk into a blob sink and only
//! commits once every part has arrived and validated; the metadata record
//! is inserted strictly after the blob commit succeeds. Any failure along
//! the way aborts the sink, so no metadata can ever reference bytes that
//! don't exist.

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::warn;

use muster_blob::BlobSink;
use muster_core::{BlobId, DeviceId, MediaKind, MediaRecord, RecordId};

use crate::error::ApiError;

use super::AppState;
use super::schemas::{DeviceFilter, ErrorResponse, UploadResponse};

/// Accumulated multipart state for one upload request.
#[derive(Default)]
struct PendingUpload {
    device_id: Option<DeviceId>,
    kind: MediaKind,
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
    file: Option<StagedFile>,
}

struct StagedFile {
    sink: Box<dyn BlobSink>,
    filename: String,
    content_type: String,
}

impl PendingUpload {
    /// Discard the staged blob, if any. Abort failures are logged; the
    /// staged bytes were never visible either way.
    async fn discard(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = file.sink.abort().await {
                warn!(error = %e, "failed to abort staged upload");
            }
        }
    }
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::InvalidArgument(format!("malformed multipart body: {e}"))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// `POST /api/media/upload` -- multipart upload of one media file.
///
/// Fields: `deviceId` (required), `type` (photo/audio/video/screen,
/// optional), `metadata` (JSON object, optional), and the file itself
/// under `media`.
#[utoipa::path(
    post,
    path = "/api/media/upload",
    tag = "Media",
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing deviceId/file or malformed metadata", body = ErrorResponse),
        (status = 413, description = "File exceeds the upload ceiling", body = ErrorResponse)
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    // Declared-oversize requests are refused before reading any part.
    // The ceiling gets the same framing headroom as the body limit.
    if let Some(declared) = content_length(&headers) {
        let limit = state.max_upload_bytes;
        if declared > limit.saturating_add(1024 * 1024) {
            return Err(muster_blob::BlobError::PayloadTooLarge { declared, limit }.into());
        }
    }

    let mut upload = PendingUpload::default();

    if let Err(err) = read_parts(&state, multipart, &mut upload).await {
        upload.discard().await;
        return Err(err);
    }

    let Some(device_id) = upload.device_id.take().filter(|id| !id.is_empty()) else {
        upload.discard().await;
        return Err(ApiError::InvalidArgument("deviceId required".to_owned()));
    };
    let Some(file) = upload.file.take() else {
        return Err(ApiError::InvalidArgument("media file required".to_owned()));
    };

    // Blob first, metadata second: a record may only ever point at a
    // committed blob. If the insert below fails the blob stays as an
    // unreachable orphan, which is tolerated.
    let blob_id = file.sink.id();
    let length = file.sink.commit().await?;

    let record = MediaRecord {
        id: RecordId::generate(),
        device_id: device_id.clone(),
        filename: file.filename,
        content_type: file.content_type,
        length,
        blob_id,
        kind: upload.kind,
        metadata: upload.metadata.take(),
        created_at: Utc::now(),
    };
    state.media.insert(record.clone()).await?;
    state.registry.upsert_on_activity(&device_id, Utc::now()).await?;

    Ok(Json(UploadResponse {
        ok: true,
        file_id: blob_id,
        meta: record,
    }))
}

/// Walk the multipart fields, streaming the file part into a blob sink.
/// On error the staged sink is left in `upload` for the caller to abort.
async fn read_parts(
    state: &AppState,
    mut multipart: Multipart,
    upload: &mut PendingUpload,
) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "deviceId" => {
                upload.device_id =
                    Some(DeviceId::from(field.text().await.map_err(bad_multipart)?));
            }
            "type" => {
                upload.kind = MediaKind::parse(field.text().await.map_err(bad_multipart)?.trim());
            }
            "metadata" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                if !raw.trim().is_empty() {
                    let parsed = serde_json::from_str(&raw).map_err(|e| {
                        ApiError::InvalidArgument(format!("malformed metadata json: {e}"))
                    })?;
                    upload.metadata = Some(parsed);
                }
            }
            "media" => {
                // A repeated file field replaces the previous one.
                upload.discard().await;

                let filename = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let sink = state.blobs.begin_upload(&filename, &content_type).await?;
                let mut staged = StagedFile {
                    sink,
                    filename,
                    content_type,
                };
                let streamed = stream_field(field, staged.sink.as_mut()).await;
                upload.file = Some(staged);
                streamed?;
            }
            _ => {}
        }
    }
    Ok(())
}

async fn stream_field(mut field: Field<'_>, sink: &mut dyn BlobSink) -> Result<(), ApiError> {
    while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
        sink.write_chunk(chunk).await?;
    }
    Ok(())
}

/// `GET /api/media` -- metadata listing, newest first, capped.
#[utoipa::path(
    get,
    path = "/api/media",
    tag = "Media",
    params(DeviceFilter),
    responses(
        (status = 200, description = "Media records", body = [MediaRecord])
    )
)]
pub async fn list_media(
    State(state): State<AppState>,
    Query(filter): Query<DeviceFilter>,
) -> Result<Json<Vec<MediaRecord>>, ApiError> {
    Ok(Json(state.media.list(filter.device_id.as_ref()).await?))
}

/// `GET /api/media/{blob_id}` -- stream a stored file.
///
/// Content type comes from the stored record when one exists; the
/// attachment filename falls back to the blob id for orphaned blobs.
#[utoipa::path(
    get,
    path = "/api/media/{blob_id}",
    tag = "Media",
    params(
        ("blob_id" = String, Path, description = "Blob identifier returned by upload")
    ),
    responses(
        (status = 200, description = "File bytes"),
        (status = 404, description = "Unknown blob", body = ErrorResponse)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path(blob_id): Path<BlobId>,
) -> Result<Response, ApiError> {
    let record = state.media.find_by_blob(&blob_id).await?;
    let download = state.blobs.open_download(&blob_id).await?;

    let content_type = record
        .as_ref()
        .map_or_else(|| "application/octet-stream".to_owned(), |r| r.content_type.clone());
    let filename = record.map_or_else(|| blob_id.to_string(), |r| r.filename);
    // Keep the header parseable whatever the client named the file.
    let filename = filename.replace(['"', '\r', '\n'], "_");

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_LENGTH, download.length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, Body::from_stream(download.stream)).into_response())
}
