use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::ModelService;
use crate::domain::{ConversationId, OwnerId};
use crate::presentation::state::AppState;

use super::ErrorResponse;
use super::files::OwnerQuery;

#[derive(Serialize)]
pub struct SavedMessagesResponse {
    pub chat_id: Uuid,
    pub messages: Vec<SavedMessage>,
}

#[derive(Serialize)]
pub struct SavedMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct ChatIndexResponse {
    pub chats: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct DeleteAllRequest {
    pub owner_id: String,
}

#[derive(Serialize)]
pub struct DeleteAllResponse {
    pub deleted: u64,
}

/// Stored history of one conversation, in conversation order.
#[tracing::instrument(skip(state, query), fields(chat_id = %chat_id))]
pub async fn saved_messages_handler<M>(
    State(state): State<AppState<M>>,
    Path(chat_id): Path<Uuid>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    let owner = OwnerId::new(query.owner_id);
    let id = ConversationId::from_uuid(chat_id);

    match state
        .conversation_repository
        .get_conversation(&owner, id)
        .await
    {
        Ok(Some(conversation)) => (
            StatusCode::OK,
            Json(SavedMessagesResponse {
                chat_id,
                messages: conversation
                    .history
                    .iter()
                    .map(|m| SavedMessage {
                        role: m.role.to_string(),
                        content: m.content.clone(),
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
            tracing::error!(error = %e, "History read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("History read failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// Index of the owner's conversations, most recently touched first.
#[tracing::instrument(skip(state, query))]
pub async fn chat_index_handler<M>(
    State(state): State<AppState<M>>,
    Query(query): Query<OwnerQuery>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    let owner = OwnerId::new(query.owner_id);

    match state.conversation_repository.list_conversations(&owner).await {
        Ok(ids) => (
            StatusCode::OK,
            Json(ChatIndexResponse {
                chats: ids.into_iter().map(|id| id.as_uuid()).collect(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Chat index read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Chat index read failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// Whole-history delete for the owner.
#[tracing::instrument(skip(state, request), fields(owner = %request.owner_id))]
pub async fn delete_all_handler<M>(
    State(state): State<AppState<M>>,
    Json(request): Json<DeleteAllRequest>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    let owner = OwnerId::new(request.owner_id);

    match state.conversation_repository.delete_all(&owner).await {
        Ok(deleted) => {
            tracing::info!(deleted = deleted, "Conversations deleted");
            (StatusCode::OK, Json(DeleteAllResponse { deleted })).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Bulk delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Bulk delete failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}
