//! File upload and download handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;

/// Bytes escaped when a key becomes one URL path segment
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Download path for `key`, percent-encoded so it routes back to the same object
pub fn file_location(key: &str) -> String {
    format!("/files/{}", utf8_percent_encode(key, PATH_SEGMENT_ENCODE_SET))
}

/// Stored file description returned by an upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadResponse {
    /// Object key (the uploaded filename)
    #[schema(example = "report.pdf")]
    pub key: String,
    #[schema(example = "default")]
    pub bucket: String,
    /// Size in bytes
    pub size: usize,
    #[schema(example = "application/pdf")]
    pub content_type: String,
}

/// Upload a file
///
/// Accepts multipart/form-data with a `file` part; the part's filename becomes
/// the object key. An existing object with the same key is replaced.
#[utoipa::path(
    post,
    path = "/files/",
    tag = "Files",
    request_body(content_type = "multipart/form-data", description = "Part `file` with a filename"),
    responses(
        (status = 201, description = "File stored", body = FileUploadResponse,
            headers(("Location" = String, description = "Download path of the stored file"))),
        (status = 400, description = "Not multipart, no file part, missing filename or file too large"),
        (status = 503, description = "Object store unavailable")
    )
)]
pub async fn upload_file_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::bad_request(format!("Expected multipart form: {}", e)))?;

    let max_file_size = state.config.max_file_size_mb * 1024 * 1024;
    let fields = MultipartFields::parse(&mut multipart, max_file_size).await?;
    let file = fields.require_file()?;
    let key = file.require_file_name()?.to_string();
    let content_type = file
        .content_type_or(&state.config.default_content_type)
        .to_string();

    state
        .objects
        .upload(state.deadline(), &key, file.data.clone(), &content_type)
        .await?;

    tracing::info!(key = %key, size = file.data.len(), content_type = %content_type, "File stored");

    let location = HeaderValue::from_str(&file_location(&key))
        .map_err(|e| ApiError::internal(format!("Location header: {}", e)))?;
    let body = FileUploadResponse {
        bucket: state.objects.bucket().to_string(),
        size: file.data.len(),
        key,
        content_type,
    };

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(body)).into_response())
}

/// Download a file
///
/// Returns the stored bytes unchanged with the content type recorded at upload.
#[utoipa::path(
    get,
    path = "/files/{name}",
    tag = "Files",
    params(("name" = String, Path, description = "Object key (filename)")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "No such file"),
        (status = 503, description = "Object store unavailable")
    )
)]
pub async fn download_file_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let object = state.objects.download(state.deadline(), &name).await?;

    let content_type = if object.content_type.is_empty() {
        state.config.default_content_type.as_str()
    } else {
        object.content_type.as_str()
    };
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(crate::config::DEFAULT_CONTENT_TYPE));

    tracing::debug!(key = %object.key, size = object.data.len(), "File served");
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], object.data).into_response())
}
