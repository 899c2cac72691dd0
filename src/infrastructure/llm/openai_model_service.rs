use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::ports::{ModelMessage, ModelService, ModelServiceError, TokenStream};
use crate::domain::RunStatus;
use crate::presentation::config::LlmSettings;

const ASSISTANT_NAME: &str = "Copilot";
const ASSISTANT_INSTRUCTIONS: &str = "You are a helpful assistant that answers what is asked. \
     Retrieve the relevant information from the files.";

/// OpenAI-compatible implementation of the model service boundary: streamed
/// chat completions plus the assistants/threads/runs surface.
pub struct OpenAiModelService {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    assistant_model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Clone)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&ModelMessage> for WireMessage {
    fn from(message: &ModelMessage) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct CreateAssistantRequest {
    name: String,
    instructions: String,
    model: String,
    tools: Vec<AssistantTool>,
    tool_resources: ToolResources,
}

#[derive(Serialize)]
struct AssistantTool {
    r#type: &'static str,
}

#[derive(Serialize)]
struct ToolResources {
    code_interpreter: CodeInterpreterResources,
}

#[derive(Serialize)]
struct CodeInterpreterResources {
    file_ids: Vec<String>,
}

#[derive(Serialize)]
struct CreateThreadRequest {
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct CreateRunRequest {
    assistant_id: String,
}

#[derive(Deserialize)]
struct ObjectWithId {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    status: String,
}

#[derive(Deserialize)]
struct ThreadMessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    content: Vec<ThreadMessageContent>,
}

#[derive(Deserialize)]
struct ThreadMessageContent {
    #[serde(default)]
    text: Option<ThreadMessageText>,
}

#[derive(Deserialize)]
struct ThreadMessageText {
    value: String,
}

impl OpenAiModelService {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            chat_model: settings.chat_model.clone(),
            assistant_model: settings.assistant_model.clone(),
            temperature: settings.temperature,
        }
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// The assistants surface requires the beta opt-in header.
    fn apply_beta(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.apply_auth(request)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ModelServiceError> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelServiceError::RateLimited);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelServiceError::ApiRequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelService for OpenAiModelService {
    async fn complete_stream(
        &self,
        messages: &[ModelMessage],
    ) -> Result<TokenStream, ModelServiceError> {
        let request_body = ChatCompletionRequest {
            model: self.chat_model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: self.temperature,
            stream: true,
        };

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request_body);
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| ModelServiceError::ApiRequestFailed(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let stream = response.bytes_stream();
        let token_stream = Box::pin(stream.flat_map(|chunk_result| {
            let items: Vec<Result<String, ModelServiceError>> = match chunk_result {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    let mut tokens = Vec::new();
                    for line in text.lines() {
                        if let Some(data) = line.strip_prefix("data: ") {
                            if data == "[DONE]" {
                                break;
                            }
                            if let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(data) {
                                if let Some(choice) = chunk.choices.first() {
                                    // A delta without content is an empty
                                    // fragment, not an error.
                                    if let Some(content) = &choice.delta.content {
                                        tokens.push(Ok(content.clone()));
                                    }
                                }
                            }
                        }
                    }
                    tokens
                }
                Err(e) => vec![Err(ModelServiceError::ApiRequestFailed(e.to_string()))],
            };
            futures::stream::iter(items)
        }));

        Ok(token_stream)
    }

    async fn create_assistant(&self, file_ids: &[String]) -> Result<String, ModelServiceError> {
        let request_body = CreateAssistantRequest {
            name: ASSISTANT_NAME.to_string(),
            instructions: ASSISTANT_INSTRUCTIONS.to_string(),
            model: self.assistant_model.clone(),
            tools: vec![
                AssistantTool {
                    r#type: "code_interpreter",
                },
                AssistantTool {
                    r#type: "file_search",
                },
            ],
            tool_resources: ToolResources {
                code_interpreter: CodeInterpreterResources {
                    file_ids: file_ids.to_vec(),
                },
            },
        };

        let request = self
            .client
            .post(format!("{}/assistants", self.base_url))
            .json(&request_body);
        let response = self
            .apply_beta(request)
            .send()
            .await
            .map_err(|e| ModelServiceError::ApiRequestFailed(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let assistant: ObjectWithId = response
            .json()
            .await
            .map_err(|e| ModelServiceError::InvalidResponse(e.to_string()))?;
        Ok(assistant.id)
    }

    async fn create_thread(
        &self,
        seed_messages: &[ModelMessage],
    ) -> Result<String, ModelServiceError> {
        let request_body = CreateThreadRequest {
            messages: seed_messages.iter().map(WireMessage::from).collect(),
        };

        let request = self
            .client
            .post(format!("{}/threads", self.base_url))
            .json(&request_body);
        let response = self
            .apply_beta(request)
            .send()
            .await
            .map_err(|e| ModelServiceError::ApiRequestFailed(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let thread: ObjectWithId = response
            .json()
            .await
            .map_err(|e| ModelServiceError::InvalidResponse(e.to_string()))?;
        Ok(thread.id)
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, ModelServiceError> {
        let request_body = CreateRunRequest {
            assistant_id: assistant_id.to_string(),
        };

        let request = self
            .client
            .post(format!("{}/threads/{}/runs", self.base_url, thread_id))
            .json(&request_body);
        let response = self
            .apply_beta(request)
            .send()
            .await
            .map_err(|e| ModelServiceError::ApiRequestFailed(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let run: ObjectWithId = response
            .json()
            .await
            .map_err(|e| ModelServiceError::InvalidResponse(e.to_string()))?;
        Ok(run.id)
    }

    async fn get_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunStatus, ModelServiceError> {
        let request = self
            .client
            .get(format!(
                "{}/threads/{}/runs/{}",
                self.base_url, thread_id, run_id
            ));
        let response = self
            .apply_beta(request)
            .send()
            .await
            .map_err(|e| ModelServiceError::ApiRequestFailed(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let run: RunObject = response
            .json()
            .await
            .map_err(|e| ModelServiceError::InvalidResponse(e.to_string()))?;
        run.status
            .parse()
            .map_err(ModelServiceError::InvalidResponse)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<String>, ModelServiceError> {
        let request = self
            .client
            .get(format!("{}/threads/{}/messages", self.base_url, thread_id));
        let response = self
            .apply_beta(request)
            .send()
            .await
            .map_err(|e| ModelServiceError::ApiRequestFailed(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let list: ThreadMessageList = response
            .json()
            .await
            .map_err(|e| ModelServiceError::InvalidResponse(e.to_string()))?;

        // The API returns messages most recent first; keep that order.
        Ok(list
            .data
            .into_iter()
            .map(|m| {
                m.content
                    .into_iter()
                    .find_map(|c| c.text.map(|t| t.value))
                    .unwrap_or_default()
            })
            .collect())
    }
}
