use async_trait::async_trait;

use crate::domain::{Conversation, ConversationId, FileAttachment, Message, OwnerId};

use super::RepositoryError;

/// Store contract for the conversation aggregate. Every call is atomic on its
/// own; the engine assumes nothing else about the persistence technology.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Persists a freshly created conversation, including any messages and
    /// attachments already staged on it.
    async fn create_conversation(&self, conversation: &Conversation)
    -> Result<(), RepositoryError>;

    async fn get_conversation(
        &self,
        owner: &OwnerId,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// Appends messages to an existing conversation, in slice order.
    async fn append_messages(
        &self,
        owner: &OwnerId,
        id: ConversationId,
        messages: &[Message],
    ) -> Result<(), RepositoryError>;

    /// Replaces the conversation's file set and assistant binding together.
    async fn update_file_binding(
        &self,
        owner: &OwnerId,
        id: ConversationId,
        files: &[FileAttachment],
        assistant_id: Option<&str>,
    ) -> Result<(), RepositoryError>;

    async fn list_conversations(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<ConversationId>, RepositoryError>;

    async fn delete_all(&self, owner: &OwnerId) -> Result<u64, RepositoryError>;
}
