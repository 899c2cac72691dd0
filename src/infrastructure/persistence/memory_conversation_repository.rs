use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::ports::{ConversationRepository, RepositoryError};
use crate::domain::{Conversation, ConversationId, FileAttachment, Message, OwnerId};

/// In-memory repository for scaffold mode and tests. Writes are atomic per
/// call under one lock, matching the store contract.
#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: Mutex<HashMap<(String, Uuid), Conversation>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), RepositoryError> {
        let key = (
            conversation.owner.as_str().to_string(),
            conversation.id.as_uuid(),
        );
        let mut conversations = self.conversations.lock().await;
        if conversations.contains_key(&key) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "conversation {} already exists",
                conversation.id
            )));
        }
        conversations.insert(key, conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        owner: &OwnerId,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.lock().await;
        Ok(conversations
            .get(&(owner.as_str().to_string(), id.as_uuid()))
            .cloned())
    }

    async fn append_messages(
        &self,
        owner: &OwnerId,
        id: ConversationId,
        messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.lock().await;
        let conversation = conversations
            .get_mut(&(owner.as_str().to_string(), id.as_uuid()))
            .ok_or_else(|| RepositoryError::NotFound(format!("conversation {}", id)))?;
        conversation.history.extend_from_slice(messages);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn update_file_binding(
        &self,
        owner: &OwnerId,
        id: ConversationId,
        files: &[FileAttachment],
        assistant_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.lock().await;
        let conversation = conversations
            .get_mut(&(owner.as_str().to_string(), id.as_uuid()))
            .ok_or_else(|| RepositoryError::NotFound(format!("conversation {}", id)))?;
        conversation.files = files.to_vec();
        conversation.assistant_id = assistant_id.map(String::from);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn list_conversations(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<ConversationId>, RepositoryError> {
        let conversations = self.conversations.lock().await;
        let mut owned: Vec<&Conversation> = conversations
            .values()
            .filter(|c| c.owner == *owner)
            .collect();
        owned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(owned.iter().map(|c| c.id).collect())
    }

    async fn delete_all(&self, owner: &OwnerId) -> Result<u64, RepositoryError> {
        let mut conversations = self.conversations.lock().await;
        let before = conversations.len();
        conversations.retain(|(o, _), _| o.as_str() != owner.as_str());
        Ok((before - conversations.len()) as u64)
    }
}
