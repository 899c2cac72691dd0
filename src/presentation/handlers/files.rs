use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::ModelService;
use crate::application::services::BindingError;
use crate::domain::{ConversationId, OwnerId};
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Deserialize)]
pub struct AttachFileRequest {
    pub owner_id: String,
    #[serde(default)]
    pub chat_id: Option<Uuid>,
    pub file_id: String,
    pub display_name: String,
}

#[derive(Serialize)]
pub struct AttachFileResponse {
    pub chat_id: Uuid,
    pub file_id: String,
    pub display_name: String,
}

#[derive(Deserialize)]
pub struct DetachFileRequest {
    pub owner_id: String,
    pub chat_id: Uuid,
    pub display_name: String,
}

#[derive(Serialize)]
pub struct DetachFileResponse {
    pub message: &'static str,
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner_id: String,
}

#[derive(Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileEntry>,
}

#[derive(Serialize)]
pub struct FileEntry {
    pub file_id: String,
    pub display_name: String,
}

/// Attaches an already-uploaded remote file and rebinds the assistant.
#[tracing::instrument(skip(state, request), fields(owner = %request.owner_id, file_id = %request.file_id))]
pub async fn attach_file_handler<M>(
    State(state): State<AppState<M>>,
    Json(request): Json<AttachFileRequest>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    let owner = OwnerId::new(request.owner_id);
    let chat_id = request.chat_id.map(ConversationId::from_uuid);

    match state
        .file_binding_service
        .attach(&owner, chat_id, &request.file_id, &request.display_name)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(AttachFileResponse {
                chat_id: outcome.chat_id.as_uuid(),
                file_id: outcome.file_id,
                display_name: outcome.display_name,
            }),
        )
            .into_response(),
        Err(e) => binding_error_response(e, "Attach failed"),
    }
}

/// Detaches a file by display name, the only handle the caller holds.
#[tracing::instrument(skip(state, request), fields(owner = %request.owner_id, chat_id = %request.chat_id))]
pub async fn detach_file_handler<M>(
    State(state): State<AppState<M>>,
    Json(request): Json<DetachFileRequest>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    let owner = OwnerId::new(request.owner_id);
    let chat_id = ConversationId::from_uuid(request.chat_id);

    match state
        .file_binding_service
        .detach(&owner, chat_id, &request.display_name)
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(DetachFileResponse {
                message: "Deleted successfully",
            }),
        )
            .into_response(),
        Err(e) => binding_error_response(e, "Detach failed"),
    }
}

/// Lists a conversation's attachments.
#[tracing::instrument(skip(state, query), fields(chat_id = %chat_id))]
pub async fn list_files_handler<M>(
    State(state): State<AppState<M>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    let owner = OwnerId::new(query.owner_id);
    let chat_id = ConversationId::from_uuid(chat_id);

    match state
        .conversation_repository
        .get_conversation(&owner, chat_id)
        .await
    {
        Ok(Some(conversation)) => (
            StatusCode::OK,
            Json(FileListResponse {
                files: conversation
                    .files
                    .into_iter()
                    .map(|f| FileEntry {
                        file_id: f.file_id,
                        display_name: f.display_name,
                    })
                    .collect(),
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Conversation not found".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "File listing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("File listing failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

fn binding_error_response(error: BindingError, what: &str) -> axum::response::Response {
    match error {
        BindingError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Conversation not found".to_string(),
            }),
        )
            .into_response(),
        e @ (BindingError::Remote(_)
        | BindingError::Repository(_)
        | BindingError::InvariantViolation(_)) => {
            tracing::error!(error = %e, "{}", what);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("{}: {}", what, e),
                }),
            )
                .into_response()
        }
    }
}
