use std::sync::Arc;

use crate::application::ports::{
    ConversationRepository, ModelService, ModelServiceError, RepositoryError,
};
use crate::domain::{Conversation, ConversationId, OwnerId};

use super::run_engine::{RunEngine, RunError};

/// End-to-end turn execution: load the conversation, run the engine in the
/// mode its binding state selects, persist the prompt/reply pair, return the
/// reply. A turn either fully succeeds or leaves no trace.
pub struct ContinuationService<M>
where
    M: ModelService,
{
    repository: Arc<dyn ConversationRepository>,
    engine: RunEngine<M>,
}

#[derive(Debug, Clone)]
pub struct TurnReply {
    pub chat_id: ConversationId,
    pub content: String,
}

impl<M> ContinuationService<M>
where
    M: ModelService,
{
    pub fn new(repository: Arc<dyn ConversationRepository>, engine: RunEngine<M>) -> Self {
        Self { repository, engine }
    }

    /// First turn of a brand-new conversation. Always stateless (nothing can
    /// be bound yet); the conversation is created lazily with the pair.
    pub async fn start_turn(&self, owner: &OwnerId, prompt: &str) -> Result<TurnReply, TurnError> {
        let mut conversation = Conversation::new(owner.clone());

        let (prompt_message, assistant_message) =
            self.engine.execute(&conversation, prompt).await?;
        let content = assistant_message.content.clone();

        conversation.history.push(prompt_message);
        conversation.history.push(assistant_message);
        self.repository.create_conversation(&conversation).await?;

        tracing::info!(conversation_id = %conversation.id, "New conversation started");
        Ok(TurnReply {
            chat_id: conversation.id,
            content,
        })
    }

    /// Continuation turn on an existing conversation.
    pub async fn continue_turn(
        &self,
        owner: &OwnerId,
        chat_id: ConversationId,
        prompt: &str,
    ) -> Result<TurnReply, TurnError> {
        let conversation = self
            .repository
            .get_conversation(owner, chat_id)
            .await?
            .ok_or(TurnError::NotFound)?;

        let (prompt_message, assistant_message) =
            self.engine.execute(&conversation, prompt).await?;
        let content = assistant_message.content.clone();

        // Prompt first, reply second: slice order is history order.
        self.repository
            .append_messages(owner, chat_id, &[prompt_message, assistant_message])
            .await?;

        Ok(TurnReply { chat_id, content })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("conversation not found")]
    NotFound,
    #[error("remote service: {0}")]
    Remote(ModelServiceError),
    #[error("run did not reach a terminal state after {attempts} polls")]
    RunTimedOut { attempts: u32 },
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<RunError> for TurnError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::Remote(e) => TurnError::Remote(e),
            RunError::TimedOut { attempts } => TurnError::RunTimedOut { attempts },
        }
    }
}
