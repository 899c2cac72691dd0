use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{ConversationRepository, RepositoryError};
use crate::domain::{
    Conversation, ConversationId, FileAttachment, Message, MessageId, MessageRole, OwnerId,
};

/// Postgres adapter for the conversation aggregate. The file list travels as
/// one JSONB value, so files and binding are always written together.
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO conversations (id, owner, files, assistant_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(conversation.id.as_uuid())
        .bind(conversation.owner.as_str())
        .bind(Json(&conversation.files))
        .bind(conversation.assistant_id.as_deref())
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        for message in &conversation.history {
            insert_message(&mut tx, message).await?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, conversation_id = %id))]
    async fn get_conversation(
        &self,
        owner: &OwnerId,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner, files, assistant_id, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND owner = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let files: Json<Vec<FileAttachment>> = row
            .try_get("files")
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let message_rows = sqlx::query(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let history = message_rows
            .into_iter()
            .map(|r| {
                let role: String = r
                    .try_get("role")
                    .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
                let role = role
                    .parse::<MessageRole>()
                    .map_err(RepositoryError::QueryFailed)?;
                Ok(Message {
                    id: MessageId::from_uuid(
                        r.try_get("id")
                            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
                    ),
                    conversation_id: ConversationId::from_uuid(
                        r.try_get("conversation_id")
                            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
                    ),
                    role,
                    content: r
                        .try_get("content")
                        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
                    created_at: r
                        .try_get("created_at")
                        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(Conversation {
            id,
            owner: owner.clone(),
            history,
            files: files.0,
            assistant_id: row
                .try_get("assistant_id")
                .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
        }))
    }

    #[instrument(skip(self, messages), fields(owner = %owner, conversation_id = %id, count = messages.len()))]
    async fn append_messages(
        &self,
        owner: &OwnerId,
        id: ConversationId,
        messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        let touched = sqlx::query(
            r#"
            UPDATE conversations
            SET updated_at = $1
            WHERE id = $2 AND owner = $3
            "#,
        )
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if touched.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "conversation {} for owner {}",
                id, owner
            )));
        }

        for message in messages {
            insert_message(&mut tx, message).await?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self, files, assistant_id), fields(owner = %owner, conversation_id = %id, file_count = files.len()))]
    async fn update_file_binding(
        &self,
        owner: &OwnerId,
        id: ConversationId,
        files: &[FileAttachment],
        assistant_id: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE conversations
            SET files = $1, assistant_id = $2, updated_at = $3
            WHERE id = $4 AND owner = $5
            "#,
        )
        .bind(Json(files))
        .bind(assistant_id)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "conversation {} for owner {}",
                id, owner
            )));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn list_conversations(
        &self,
        owner: &OwnerId,
    ) -> Result<Vec<ConversationId>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id
            FROM conversations
            WHERE owner = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        rows.into_iter()
            .map(|r| {
                Ok(ConversationId::from_uuid(
                    r.try_get("id")
                        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?,
                ))
            })
            .collect()
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn delete_all(&self, owner: &OwnerId) -> Result<u64, RepositoryError> {
        // messages go with their conversations via ON DELETE CASCADE
        let deleted = sqlx::query(
            r#"
            DELETE FROM conversations
            WHERE owner = $1
            "#,
        )
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        Ok(deleted.rows_affected())
    }
}

async fn insert_message(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    message: &Message,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO messages (id, conversation_id, role, content, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(message.id.as_uuid())
    .bind(message.conversation_id.as_uuid())
    .bind(message.role.as_str())
    .bind(&message.content)
    .bind(message.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
    Ok(())
}
