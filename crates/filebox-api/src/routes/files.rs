//! File routes: validation in front of the storage gateway.
//!
//! GET    /api/file/{fileName}         Download a file (raw bytes)
//! POST   /api/file/uploadfile         Upload a file (multipart/form-data, field `file`)
//! GET    /api/file/list               List stored files
//! DELETE /api/file/delete/{fileName}  Delete a file
//! PATCH  /api/file                    Reorder files (JSON array of names)
//!
//! Every failure is a 400 with a fixed message. Backend errors are logged
//! here and never reach the client verbatim.

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
    routing::{delete, get, patch, post},
};
use filebox_common::{
    error::{FileboxError, FileboxResult},
    models::FileRecord,
    validation::{UploadCandidate, base_file_name, validate_upload},
};
use filebox_storage::StorageError;
use futures_util::TryStreamExt;
use std::sync::Arc;

use crate::AppState;

/// Used when the client sends a file part without a content type.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub fn router(max_request_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/file", patch(reorder_files))
        .route("/file/list", get(list_files))
        .route(
            "/file/uploadfile",
            post(upload_file).layer(DefaultBodyLimit::max(max_request_bytes)),
        )
        .route("/file/delete/{file_name}", delete(delete_file))
        .route("/file/{file_name}", get(download_file))
}

// ============================================================
// GET /file/{fileName}
// ============================================================

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> FileboxResult<Response> {
    if file_name.is_empty() {
        return Err(FileboxError::bad_request("FileName not provided"));
    }

    let lookup = async {
        if !state.store.exists(&file_name).await? {
            return Ok(None);
        }
        state.store.download(&file_name).await.map(Some)
    };

    match lookup.await {
        Ok(Some(file)) => Ok(file_response(file)),
        Ok(None) => Err(FileboxError::bad_request("File Doesn't exist")),
        Err(e) => Err(backend_failure(
            e,
            format!("Error downloading file:  {file_name}"),
        )),
    }
}

// ============================================================
// POST /file/uploadfile
// ============================================================

/// A file part read from the multipart body.
struct ReceivedFile {
    file_name: String,
    content_type: String,
    /// Bytes seen on the wire, including any past the size ceiling.
    length: u64,
    content: Vec<u8>,
}

impl ReceivedFile {
    fn candidate(&self) -> UploadCandidate<'_> {
        UploadCandidate {
            content_type: &self.content_type,
            length: self.length,
        }
    }
}

/// Upload a file via multipart/form-data.
///
/// Form fields:
/// - `file`: the binary file (required)
///
/// Returns the stored object's absolute location as plain text.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> FileboxResult<String> {
    let mut upload: Option<ReceivedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| FileboxError::bad_request(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue; // Ignore unknown fields
        }
        // A part without a filename is a plain form value, not a file.
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        let mut content = Vec::new();
        let mut length = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| FileboxError::bad_request(format!("Failed to read file: {e}")))?
        {
            length += chunk.len() as u64;
            // Past the ceiling the part is only counted, not buffered.
            if length <= state.files.max_file_size_bytes {
                content.extend_from_slice(&chunk);
            }
        }

        upload = Some(ReceivedFile {
            file_name,
            content_type,
            length,
            content,
        });
    }

    validate_upload(upload.as_ref().map(ReceivedFile::candidate), &state.files)?;
    let file = upload.ok_or_else(|| FileboxError::bad_request("file not uploaded"))?;

    let record = FileRecord::with_content(
        base_file_name(&file.file_name),
        file.content_type,
        file.content,
    );

    state.store.upload(record).await.map_err(|e| {
        backend_failure(e, format!("failed to upload file : {} ", file.file_name))
    })
}

// ============================================================
// GET /file/list
// ============================================================

pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> FileboxResult<Json<Vec<FileRecord>>> {
    let listing = async {
        state
            .store
            .list()
            .await?
            .try_collect::<Vec<_>>()
            .await
    };

    listing
        .await
        .map(Json)
        .map_err(|e| backend_failure(e, "Error getting file list".to_string()))
}

// ============================================================
// DELETE /file/delete/{fileName}
// ============================================================

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> FileboxResult<String> {
    if file_name.is_empty() {
        return Err(FileboxError::bad_request("FileName not provided"));
    }

    // None: not found; Some(deleted)
    let outcome = async {
        if !state.store.exists(&file_name).await? {
            return Ok(None);
        }
        state.store.delete(&file_name).await.map(Some)
    };

    match outcome.await {
        Ok(Some(true)) => Ok(format!("File : {file_name} deleted successfully")),
        Ok(Some(false)) => Err(FileboxError::bad_request(format!(
            "Unable to delete file : {file_name}"
        ))),
        Ok(None) => Err(FileboxError::bad_request("File Doesn't exist")),
        Err(e) => Err(backend_failure(
            e,
            format!("failed to delete file : {file_name} "),
        )),
    }
}

// ============================================================
// PATCH /file
// ============================================================

pub async fn reorder_files(
    State(state): State<Arc<AppState>>,
    Json(file_names): Json<Vec<String>>,
) -> FileboxResult<Json<bool>> {
    // Known inverted check: non-empty lists are rejected, so only an empty
    // list ever reaches the store.
    if !file_names.is_empty() {
        return Err(FileboxError::bad_request("File list is empty"));
    }

    let files = file_names.into_iter().map(FileRecord::named).collect();

    state
        .store
        .reorder(files)
        .await
        .map(Json)
        .map_err(|e| backend_failure(e, "unable to re-Order files".to_string()))
}

// ============================================================
// Helpers
// ============================================================

/// Log a gateway error and replace it with a fixed client-facing message.
fn backend_failure(error: StorageError, message: String) -> FileboxError {
    tracing::error!(error = ?error, "{message}");
    FileboxError::BadRequest { message }
}

fn file_response(file: FileRecord) -> Response {
    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    let mut response = Response::new(Body::from(file.content.unwrap_or_default()));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}
