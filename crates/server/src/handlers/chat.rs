//! # Chat Handlers
//!
//! Text submissions, multipart submissions with images, and transcript retrieval.
//! Every handler works on one session's conversation, identified by `session_id`.

use super::{wrap_response, ApiResponse, AppError, AppState, DebugParams};
use crate::types::{ChatRequest, ChatResponse, HistoryResponse, UploadResponse};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::Multipart;
use hslookup::{
    constants::{ALLOWED_IMAGE_EXTENSIONS, MAX_UPLOAD_IMAGES},
    PromptError,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

/// Reply for a submission that carried images but no text.
pub const IMAGES_SAVED_NOTICE: &str =
    "Images received. Please add a text question to look up HS Codes.";

const MAX_SESSION_ID_LEN: usize = 64;

/// Session ids become directory names for uploads, so only a safe alphabet is accepted.
fn validate_session_id(session_id: Option<String>) -> Result<Option<String>, AppError> {
    let Some(id) = session_id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let well_formed = id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(Some(id))
    } else {
        Err(AppError::BadRequest(format!(
            "Invalid session id '{id}': use at most {MAX_SESSION_ID_LEN} letters, digits, '-' or '_'."
        )))
    }
}

/// Returns the lower-cased extension of an uploaded file if it is an accepted image type.
fn image_extension(file_name: Option<&str>) -> Result<String, AppError> {
    let file_name = file_name.unwrap_or_default();
    let extension = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(AppError::BadRequest(format!(
            "Unsupported image '{file_name}'. Allowed types: {}.",
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        )))
    }
}

/// Handler for `POST /chat`: runs one text submission through the lookup pipeline.
pub async fn chat_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>, AppError> {
    if payload.message.trim().is_empty() {
        return Err(PromptError::EmptyMessage.into());
    }
    let session_id = validate_session_id(payload.session_id)?;
    let (session_id, conversation) = app_state.sessions.get_or_create(session_id).await;
    info!("Chat message for session '{session_id}'.");

    let mut conversation = conversation.lock().await;
    let report = app_state
        .assistant
        .handle_message(&mut conversation, &payload.message)
        .await?;

    let debug_info = json!({
        "backend": app_state.assistant.backend.name(),
        "dialect": app_state.assistant.dialect().language(),
        "history_length": conversation.len(),
    });
    Ok(wrap_response(
        ChatResponse {
            session_id,
            kind: report.kind,
            executed_query: report.executed_query,
            reply: report.reply,
        },
        debug_params,
        Some(debug_info),
    ))
}

/// Handler for `POST /chat/upload`.
///
/// Accepts the multipart fields `session_id`, `message` and up to three `images`.
/// Images are written to `<upload_dir>/<session_id>/temp_image_<i>.<ext>` and are not
/// otherwise used. A submission with images but no text saves them and returns a
/// notice without adding turns to the conversation.
pub async fn upload_handler(
    State(app_state): State<AppState>,
    debug_params: Query<DebugParams>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResponse>>, AppError> {
    let mut session_id: Option<String> = None;
    let mut message = String::new();
    let mut images: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "session_id" => {
                session_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            "message" => {
                message = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
            }
            "images" | "image" => {
                if images.len() >= MAX_UPLOAD_IMAGES {
                    return Err(AppError::BadRequest(format!(
                        "At most {MAX_UPLOAD_IMAGES} images can be uploaded at once."
                    )));
                }
                let extension = image_extension(field.file_name())?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                images.push((extension, bytes.to_vec()));
            }
            other => warn!("Ignoring unexpected multipart field '{other}'."),
        }
    }

    if message.trim().is_empty() && images.is_empty() {
        return Err(PromptError::EmptyMessage.into());
    }

    let session_id = validate_session_id(session_id)?;
    let (session_id, conversation) = app_state.sessions.get_or_create(session_id).await;

    let session_dir = PathBuf::from(&app_state.config.upload_dir).join(&session_id);
    let mut saved_images = Vec::with_capacity(images.len());
    if !images.is_empty() {
        tokio::fs::create_dir_all(&session_dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create upload dir: {e}")))?;
    }
    for (i, (extension, bytes)) in images.iter().enumerate() {
        let path = session_dir.join(format!("temp_image_{i}.{extension}"));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to save image: {e}")))?;
        saved_images.push(path.display().to_string());
    }
    info!(
        "Upload for session '{session_id}': {} image(s) saved.",
        saved_images.len()
    );

    let mut conversation = conversation.lock().await;
    let response = if message.trim().is_empty() {
        UploadResponse {
            session_id,
            saved_images,
            kind: None,
            executed_query: None,
            reply: IMAGES_SAVED_NOTICE.to_string(),
        }
    } else {
        let report = app_state
            .assistant
            .handle_message(&mut conversation, &message)
            .await?;
        UploadResponse {
            session_id,
            saved_images,
            kind: Some(report.kind),
            executed_query: report.executed_query,
            reply: report.reply,
        }
    };

    let debug_info = json!({ "history_length": conversation.len() });
    Ok(wrap_response(response, debug_params, Some(debug_info)))
}

/// Handler for `GET /sessions/{session_id}/history`: the ordered transcript.
pub async fn history_handler(
    State(app_state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ApiResponse<HistoryResponse>>, AppError> {
    let conversation = app_state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Unknown session '{session_id}'.")))?;
    let turns = conversation.lock().await.turns().to_vec();

    Ok(Json(ApiResponse {
        debug: None,
        result: HistoryResponse { session_id, turns },
    }))
}
