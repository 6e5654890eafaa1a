use crate::AppState;
use crate::api::error::AppError;
use crate::services::gateway::{AudioStatus, GatewayError};
use crate::utils::validation::is_blank_filename;
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use utoipa::{IntoParams, ToSchema};

pub const FILENAME_EMPTY: &str = "filename is empty";
pub const AUDIO_PRESENT: &str = "audio file present";
pub const AUDIO_NOT_GENERATED: &str = "audio file not generated yet";

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Always the string "true" on success
    pub file_uploaded: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub found: String,
}

#[derive(Serialize, ToSchema)]
pub struct AudioStatusResponse {
    pub document: String,
    pub audio: Vec<AudioStatus>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilenameQuery {
    /// File name, without any directory part
    pub filename: Option<String>,
}

#[utoipa::path(
    post,
    path = "/file/upload",
    request_body(content = Multipart, description = "Document in the `file` field"),
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Missing file or invalid file name"),
        (status = 413, description = "File too large"),
        (status = 500, description = "Staging or object store failure")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut uploaded = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        // Other fields (the web client also sends `fileName`) are skipped.
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("File name is missing".to_string()))?;

        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        let key = state
            .gateway
            .upload_file(&filename, reader)
            .await
            .map_err(upload_error)?;
        uploaded = Some(key);
    }

    let key = uploaded.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;
    tracing::info!("📄 Document {} uploaded", key);

    Ok(Json(UploadResponse {
        file_uploaded: "true".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/file/find/",
    params(FilenameQuery),
    responses(
        (status = 200, description = "Lookup result message", body = SearchResponse),
        (status = 400, description = "Invalid file name")
    ),
    tag = "files"
)]
pub async fn search_file(
    State(state): State<AppState>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let filename = query.filename.unwrap_or_default();

    let found = if is_blank_filename(&filename) {
        FILENAME_EMPTY
    } else if state.gateway.find_audio(&filename).await? {
        AUDIO_PRESENT
    } else {
        AUDIO_NOT_GENERATED
    };

    Ok(Json(SearchResponse {
        found: found.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/file/download/",
    params(FilenameQuery),
    responses(
        (status = 200, description = "Audio file stream, or an empty body when the file is not available"),
        (status = 400, description = "Invalid file name")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Query(query): Query<FilenameQuery>,
) -> Result<Response, AppError> {
    let filename = query.filename.unwrap_or_default();
    let location = state.gateway.locate(&filename)?;

    // A failed fetch is not fatal: an earlier download may still be staged.
    match state.gateway.download_file(&location.name).await {
        Ok(_) => {}
        Err(GatewayError::NotFound(key)) => {
            tracing::info!("Audio object {} not generated yet", key)
        }
        Err(e) => tracing::error!("Exception while downloading {}: {}", location.audio_key, e),
    }

    let file = match tokio::fs::File::open(&location.staging_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("File {} does not exist in the audio bucket yet", location.name);
            return Ok(StatusCode::OK.into_response());
        }
        Err(e) => return Err(AppError::Gateway(e.into())),
    };

    let metadata = file.metadata().await.map_err(GatewayError::from)?;
    if !metadata.is_file() {
        return Ok(StatusCode::OK.into_response());
    }

    let (content_type, content_disposition) = resolve_file_headers(&location.name);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build download response: {}", e)))
}

#[utoipa::path(
    get,
    path = "/file/status/",
    params(FilenameQuery),
    responses(
        (status = 200, description = "Audio variants generated for a document", body = AudioStatusResponse),
        (status = 400, description = "Missing or invalid document name")
    ),
    tag = "files"
)]
pub async fn audio_status(
    State(state): State<AppState>,
    Query(query): Query<FilenameQuery>,
) -> Result<Json<AudioStatusResponse>, AppError> {
    let document = query.filename.unwrap_or_default();
    if is_blank_filename(&document) {
        return Err(AppError::BadRequest(FILENAME_EMPTY.to_string()));
    }

    let audio = state.gateway.audio_status(&document).await?;
    Ok(Json(AudioStatusResponse { document, audio }))
}

fn multipart_error(e: &MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Body-limit errors surface mid-stream as I/O errors wrapping the multipart error.
fn upload_error(e: GatewayError) -> AppError {
    if let GatewayError::Io(io) = &e {
        if let Some(mp) = io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<MultipartError>())
        {
            return multipart_error(mp);
        }
    }
    AppError::Gateway(e)
}

/// Content type and disposition for a staged file.
pub(crate) fn resolve_file_headers(filename: &str) -> (String, String) {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let content_type = match extension.as_str() {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "txt" => Some("text/plain"),
        _ => None,
    }
    .map(str::to_string)
    .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());

    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };

    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();
    let content_disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    );

    (content_type, content_disposition)
}
