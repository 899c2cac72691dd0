use async_trait::async_trait;

use crate::application::ports::{ModelMessage, ModelService, ModelServiceError, TokenStream};
use crate::domain::RunStatus;

/// Canned-response model service for scaffold mode and tests: streams a fixed
/// reply, binds to a fixed assistant, and completes every run on the first
/// poll.
pub struct MockModelService;

#[async_trait]
impl ModelService for MockModelService {
    async fn complete_stream(
        &self,
        _messages: &[ModelMessage],
    ) -> Result<TokenStream, ModelServiceError> {
        Ok(Box::pin(futures::stream::iter(vec![
            Ok("Mock ".to_string()),
            Ok("answer".to_string()),
        ])))
    }

    async fn create_assistant(&self, _file_ids: &[String]) -> Result<String, ModelServiceError> {
        Ok("asst_mock".to_string())
    }

    async fn create_thread(
        &self,
        _seed_messages: &[ModelMessage],
    ) -> Result<String, ModelServiceError> {
        Ok("thread_mock".to_string())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<String, ModelServiceError> {
        Ok("run_mock".to_string())
    }

    async fn get_run(
        &self,
        _thread_id: &str,
        _run_id: &str,
    ) -> Result<RunStatus, ModelServiceError> {
        Ok(RunStatus::Completed)
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<String>, ModelServiceError> {
        Ok(vec!["Mock answer".to_string()])
    }
}
