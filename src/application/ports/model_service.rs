use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;

use crate::domain::{Message, MessageRole, RunStatus};

pub type TokenStream =
    Pin<Box<dyn Stream<Item = Result<String, ModelServiceError>> + Send + 'static>>;

/// A message as sent over the wire to the remote model service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

impl From<&Message> for ModelMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Remote model service boundary: streaming chat completions plus the
/// stateful assistant/thread/run surface.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Streaming chat completion; fragments arrive in generation order.
    async fn complete_stream(
        &self,
        messages: &[ModelMessage],
    ) -> Result<TokenStream, ModelServiceError>;

    /// (Re)creates a tool-augmented assistant scoped to exactly `file_ids`.
    async fn create_assistant(&self, file_ids: &[String]) -> Result<String, ModelServiceError>;

    async fn create_thread(
        &self,
        seed_messages: &[ModelMessage],
    ) -> Result<String, ModelServiceError>;

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, ModelServiceError>;

    async fn get_run(&self, thread_id: &str, run_id: &str)
    -> Result<RunStatus, ModelServiceError>;

    /// Message texts of a thread, most recent first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<String>, ModelServiceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ModelServiceError {
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("rate limited")]
    RateLimited,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
