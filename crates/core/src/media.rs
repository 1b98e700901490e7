use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BlobId, DeviceId, RecordId};

/// Logical category of an uploaded media file.
///
/// Client-supplied tags go through [`MediaKind::parse`], which folds
/// unknown values to [`MediaKind::Other`] rather than failing the upload;
/// clients ship categories the server has not heard of yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Audio,
    Video,
    Screen,
    #[default]
    Other,
}

impl MediaKind {
    /// Parse a client-supplied category tag, folding unknown values to
    /// [`MediaKind::Other`].
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "photo" => Self::Photo,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "screen" => Self::Screen,
            _ => Self::Other,
        }
    }
}

/// Metadata record describing one uploaded media file.
///
/// A record is only ever constructed after its referenced blob has been
/// committed, so `blob_id` always points at fully written bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    /// Unique record identifier.
    pub id: RecordId,
    /// Owning device.
    pub device_id: DeviceId,
    /// Original filename as supplied by the uploader.
    pub filename: String,
    /// Declared MIME content type.
    pub content_type: String,
    /// Total byte length of the committed blob.
    pub length: u64,
    /// The committed blob holding the file bytes.
    pub blob_id: BlobId,
    /// Logical category tag.
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Free-form client attributes, validated for JSON well-formedness only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}
