use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::ModelService;
use crate::application::services::{TurnError, TurnReply};
use crate::domain::{ConversationId, OwnerId};
use crate::infrastructure::observability::sanitize_prompt;
use crate::presentation::state::AppState;

use super::ErrorResponse;

#[derive(Deserialize)]
pub struct NewTurnRequest {
    pub owner_id: String,
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct ContinueTurnRequest {
    pub owner_id: String,
    pub chat_id: Uuid,
    pub prompt: String,
}

#[derive(Serialize)]
pub struct TurnResponse {
    pub chat_id: Uuid,
    pub content: String,
}

impl From<TurnReply> for TurnResponse {
    fn from(reply: TurnReply) -> Self {
        Self {
            chat_id: reply.chat_id.as_uuid(),
            content: reply.content,
        }
    }
}

/// First turn of a new conversation.
#[tracing::instrument(skip(state, request), fields(owner = %request.owner_id))]
pub async fn new_turn_handler<M>(
    State(state): State<AppState<M>>,
    Json(request): Json<NewTurnRequest>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    if request.prompt.trim().is_empty() {
        tracing::warn!("Turn request with empty prompt");
        return empty_prompt_response();
    }
    tracing::debug!(prompt = %sanitize_prompt(&request.prompt), "Starting conversation");

    let owner = OwnerId::new(request.owner_id);
    let result = state
        .continuation_service
        .start_turn(&owner, &request.prompt)
        .await;
    turn_result_response(result)
}

/// Continuation turn on an existing conversation.
#[tracing::instrument(skip(state, request), fields(owner = %request.owner_id, chat_id = %request.chat_id))]
pub async fn continue_turn_handler<M>(
    State(state): State<AppState<M>>,
    Json(request): Json<ContinueTurnRequest>,
) -> impl IntoResponse
where
    M: ModelService + 'static,
{
    if request.prompt.trim().is_empty() {
        tracing::warn!("Turn request with empty prompt");
        return empty_prompt_response();
    }
    tracing::debug!(prompt = %sanitize_prompt(&request.prompt), "Continuing conversation");

    let owner = OwnerId::new(request.owner_id);
    let chat_id = ConversationId::from_uuid(request.chat_id);
    let result = state
        .continuation_service
        .continue_turn(&owner, chat_id, &request.prompt)
        .await;
    turn_result_response(result)
}

fn empty_prompt_response() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "No prompt provided".to_string(),
        }),
    )
        .into_response()
}

/// The turn result is matched exhaustively: every outcome produces either a
/// complete success payload or an explicit error, never neither.
fn turn_result_response(result: Result<TurnReply, TurnError>) -> axum::response::Response {
    match result {
        Ok(reply) => {
            tracing::info!(chat_id = %reply.chat_id, "Turn completed");
            (StatusCode::OK, Json(TurnResponse::from(reply))).into_response()
        }
        Err(TurnError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Conversation not found".to_string(),
            }),
        )
            .into_response(),
        Err(e @ TurnError::RunTimedOut { .. }) => {
            tracing::error!(error = %e, "Turn timed out");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Turn failed: {}", e),
                }),
            )
                .into_response()
        }
        Err(e @ (TurnError::Remote(_) | TurnError::Repository(_))) => {
            tracing::error!(error = %e, "Turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Turn failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}
