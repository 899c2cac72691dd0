use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::application::ports::ModelService;
use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    attach_file_handler, chat_index_handler, continue_turn_handler, delete_all_handler,
    detach_file_handler, health_handler, list_files_handler, new_turn_handler,
    saved_messages_handler,
};
use crate::presentation::state::AppState;

pub fn create_router<M>(state: AppState<M>) -> Router
where
    M: ModelService + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/v1/chat",
            post(new_turn_handler::<M>)
                .put(continue_turn_handler::<M>)
                .get(chat_index_handler::<M>)
                .delete(delete_all_handler::<M>),
        )
        .route(
            "/api/v1/chat/{chat_id}/messages",
            get(saved_messages_handler::<M>),
        )
        .route("/api/v1/chat/{chat_id}/files", get(list_files_handler::<M>))
        .route(
            "/api/v1/files",
            post(attach_file_handler::<M>).delete(detach_file_handler::<M>),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
