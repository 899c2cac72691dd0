use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;

use crate::application::ports::{ModelMessage, ModelService, ModelServiceError};
use crate::domain::{Conversation, Message, MessageRole, RunStatus};

/// Produces exactly one assistant message per prompt. Mode is picked from the
/// conversation's binding state: a grounded assistant runs statefully through
/// a remote thread, everything else goes through a streamed completion built
/// from stored history.
pub struct RunEngine<M>
where
    M: ModelService,
{
    model_service: Arc<M>,
    system_prompt: String,
    poll_max_attempts: u32,
    poll_interval: Duration,
}

impl<M> RunEngine<M>
where
    M: ModelService,
{
    pub fn new(
        model_service: Arc<M>,
        system_prompt: String,
        poll_max_attempts: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            model_service,
            system_prompt,
            poll_max_attempts,
            poll_interval,
        }
    }

    /// Runs one turn and returns the `(prompt, reply)` pair ready for
    /// persistence. Nothing is persisted here; on error no partial message
    /// escapes.
    pub async fn execute(
        &self,
        conversation: &Conversation,
        prompt: &str,
    ) -> Result<(Message, Message), RunError> {
        let content = match conversation.grounded_assistant_id() {
            Some(assistant_id) => {
                tracing::debug!(
                    conversation_id = %conversation.id,
                    assistant_id = %assistant_id,
                    "Running stateful turn"
                );
                self.run_stateful(assistant_id, prompt).await?
            }
            None => {
                tracing::debug!(
                    conversation_id = %conversation.id,
                    history_len = conversation.history.len(),
                    "Running stateless turn"
                );
                self.run_stateless(&conversation.history, prompt).await?
            }
        };

        let prompt_message = Message::new(conversation.id, MessageRole::User, prompt.to_string());
        let assistant_message = Message::new(conversation.id, MessageRole::Assistant, content);
        Ok((prompt_message, assistant_message))
    }

    /// Stateful path. The thread is seeded with the prompt alone: memory is
    /// the remote assistant's job, stored history is not resent.
    async fn run_stateful(&self, assistant_id: &str, prompt: &str) -> Result<String, RunError> {
        let seed = [ModelMessage::user(prompt)];
        let thread_id = self.model_service.create_thread(&seed).await?;
        let run_id = self
            .model_service
            .create_run(&thread_id, assistant_id)
            .await?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let status = self.model_service.get_run(&thread_id, &run_id).await?;
            match status {
                RunStatus::Completed => break,
                status if status.is_terminal() => {
                    return Err(RunError::Remote(ModelServiceError::ApiRequestFailed(
                        format!("run {} ended with status {}", run_id, status),
                    )));
                }
                _ => {}
            }
            if attempts >= self.poll_max_attempts {
                tracing::warn!(
                    run_id = %run_id,
                    attempts = attempts,
                    "Run polling budget exhausted"
                );
                return Err(RunError::TimedOut { attempts });
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        let texts = self.model_service.list_messages(&thread_id).await?;
        texts.into_iter().next().ok_or_else(|| {
            RunError::Remote(ModelServiceError::InvalidResponse(
                "thread has no messages after completed run".to_string(),
            ))
        })
    }

    /// Stateless path: `[system] + history + prompt`, streamed and
    /// accumulated into a single reply.
    async fn run_stateless(&self, history: &[Message], prompt: &str) -> Result<String, RunError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ModelMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().map(ModelMessage::from));
        messages.push(ModelMessage::user(prompt));

        let mut token_stream = self.model_service.complete_stream(&messages).await?;
        let mut accumulated = String::new();
        while let Some(fragment) = token_stream.next().await {
            accumulated.push_str(&fragment?);
        }
        Ok(accumulated)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("remote service: {0}")]
    Remote(#[from] ModelServiceError),
    #[error("run did not reach a terminal state after {attempts} polls")]
    TimedOut { attempts: u32 },
}
