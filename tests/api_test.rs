use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use sibu::application::ports::ConversationRepository;
use sibu::application::services::{ContinuationService, FileBindingService, RunEngine};
use sibu::infrastructure::llm::MockModelService;
use sibu::infrastructure::persistence::InMemoryConversationRepository;
use sibu::presentation::config::{
    DatabaseSettings, Environment, LlmSettings, ScaffoldSettings, ServerSettings, Settings,
};
use sibu::presentation::{AppState, create_router};

fn test_settings() -> Settings {
    Settings {
        environment: Environment::Test,
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        llm: LlmSettings {
            api_key: String::new(),
            base_url: "http://localhost:9".to_string(),
            chat_model: "test-model".to_string(),
            assistant_model: "test-model".to_string(),
            temperature: 0.5,
            system_prompt: "You are a helpful assistant.".to_string(),
            run_poll_max_attempts: 5,
            run_poll_interval_ms: 1,
        },
        database: DatabaseSettings { url: None },
        scaffold: ScaffoldSettings { enabled: true },
    }
}

fn create_test_app() -> axum::Router {
    let settings = test_settings();
    let repository: Arc<dyn ConversationRepository> =
        Arc::new(InMemoryConversationRepository::new());
    let model_service = Arc::new(MockModelService);

    let engine = RunEngine::new(
        Arc::clone(&model_service),
        settings.llm.system_prompt.clone(),
        settings.llm.run_poll_max_attempts,
        Duration::from_millis(settings.llm.run_poll_interval_ms),
    );
    let continuation_service = Arc::new(ContinuationService::new(Arc::clone(&repository), engine));
    let file_binding_service = Arc::new(FileBindingService::new(
        Arc::clone(&repository),
        model_service,
    ));

    create_router(AppState {
        continuation_service,
        file_binding_service,
        conversation_repository: repository,
        settings,
    })
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn given_running_server_when_health_check_then_returns_ok() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn given_new_prompt_when_posted_then_chat_id_and_content_returned() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1", "prompt": "2+2?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["content"], "Mock answer");
    assert!(body["chat_id"].is_string());
}

#[tokio::test]
async fn given_empty_prompt_when_posted_then_bad_request() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1", "prompt": "   " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn given_unknown_chat_when_continued_then_not_found() {
    let app = create_test_app();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/chat",
            serde_json::json!({
                "owner_id": "user-1",
                "chat_id": uuid::Uuid::new_v4(),
                "prompt": "hello again"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn given_started_chat_when_continued_then_turn_succeeds() {
    let app = create_test_app();

    let started = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1", "prompt": "first" }),
        ))
        .await
        .unwrap();
    let chat_id = json_body(started).await["chat_id"].clone();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/chat",
            serde_json::json!({
                "owner_id": "user-1",
                "chat_id": chat_id,
                "prompt": "second"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["chat_id"], chat_id);
    assert_eq!(body["content"], "Mock answer");
}

#[tokio::test]
async fn given_attached_file_when_files_listed_then_entry_present() {
    let app = create_test_app();

    let attached = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/files",
            serde_json::json!({
                "owner_id": "user-1",
                "file_id": "f1",
                "display_name": "report.pdf"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(attached.status(), StatusCode::OK);
    let chat_id = json_body(attached).await["chat_id"].clone();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/v1/chat/{}/files?owner_id=user-1",
                    chat_id.as_str().unwrap()
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["files"][0]["file_id"], "f1");
    assert_eq!(body["files"][0]["display_name"], "report.pdf");
}

#[tokio::test]
async fn given_attached_file_when_detached_then_success_message() {
    let app = create_test_app();

    let attached = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/files",
            serde_json::json!({
                "owner_id": "user-1",
                "file_id": "f1",
                "display_name": "report.pdf"
            }),
        ))
        .await
        .unwrap();
    let chat_id = json_body(attached).await["chat_id"].clone();

    let response = app
        .oneshot(json_request(
            "DELETE",
            "/api/v1/files",
            serde_json::json!({
                "owner_id": "user-1",
                "chat_id": chat_id,
                "display_name": "report.pdf"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Deleted successfully");
}

#[tokio::test]
async fn given_saved_chat_when_messages_read_then_history_in_order() {
    let app = create_test_app();

    let started = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1", "prompt": "first" }),
        ))
        .await
        .unwrap();
    let chat_id = json_body(started).await["chat_id"].clone();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/v1/chat/{}/messages?owner_id=user-1",
                    chat_id.as_str().unwrap()
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "first");
    assert_eq!(body["messages"][1]["role"], "assistant");
}

#[tokio::test]
async fn given_conversations_when_index_listed_then_chat_ids_returned() {
    let app = create_test_app();

    let started = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1", "prompt": "hello" }),
        ))
        .await
        .unwrap();
    let chat_id = json_body(started).await["chat_id"].clone();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?owner_id=user-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["chats"][0], chat_id);
}

#[tokio::test]
async fn given_conversations_when_bulk_deleted_then_index_empty() {
    let app = create_test_app();

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1", "prompt": "hello" }),
        ))
        .await
        .unwrap();

    let deleted = app
        .clone()
        .oneshot(json_request(
            "DELETE",
            "/api/v1/chat",
            serde_json::json!({ "owner_id": "user-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(json_body(deleted).await["deleted"], 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/chat?owner_id=user-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["chats"].as_array().unwrap().len(), 0);
}
