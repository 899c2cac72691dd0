use std::collections::HashSet;
use std::sync::Arc;

use crate::application::ports::{
    ConversationRepository, ModelService, ModelServiceError, RepositoryError,
};
use crate::domain::{Conversation, ConversationId, FileAttachment, OwnerId};

/// Keeps a conversation's assistant binding in lockstep with its file set.
/// All mutation is staged on an owned copy of the aggregate and committed
/// only after the remote assistant call succeeds, so a failed (re)creation
/// leaves both the file list and the binding exactly as they were.
pub struct FileBindingService<M>
where
    M: ModelService,
{
    repository: Arc<dyn ConversationRepository>,
    model_service: Arc<M>,
}

#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub chat_id: ConversationId,
    pub file_id: String,
    pub display_name: String,
}

impl<M> FileBindingService<M>
where
    M: ModelService,
{
    pub fn new(repository: Arc<dyn ConversationRepository>, model_service: Arc<M>) -> Self {
        Self {
            repository,
            model_service,
        }
    }

    /// Attaches a file and rebinds the assistant to the full updated id list.
    /// With no `chat_id` the conversation is created lazily, matching the
    /// first-upload lifecycle.
    pub async fn attach(
        &self,
        owner: &OwnerId,
        chat_id: Option<ConversationId>,
        file_id: &str,
        display_name: &str,
    ) -> Result<AttachOutcome, BindingError> {
        let existing = match chat_id {
            Some(id) => self.repository.get_conversation(owner, id).await?,
            None => None,
        };
        let is_new = existing.is_none();
        let mut staged = existing.unwrap_or_else(|| Conversation::new(owner.clone()));

        if !staged.has_file(file_id) {
            staged
                .files
                .push(FileAttachment::new(file_id, display_name));
        }
        ensure_unique_file_ids(&staged.files)?;

        let assistant_id = self
            .model_service
            .create_assistant(&staged.file_ids())
            .await?;
        staged.assistant_id = Some(assistant_id);

        if is_new {
            self.repository.create_conversation(&staged).await?;
        } else {
            self.repository
                .update_file_binding(owner, staged.id, &staged.files, staged.assistant_id.as_deref())
                .await?;
        }

        tracing::info!(
            conversation_id = %staged.id,
            file_id = %file_id,
            file_count = staged.files.len(),
            "File attached and assistant rebound"
        );

        Ok(AttachOutcome {
            chat_id: staged.id,
            file_id: file_id.to_string(),
            display_name: display_name.to_string(),
        })
    }

    /// Detaches a file by its display name, the only handle the caller has.
    /// An unknown name is a no-op returning the current binding. If an
    /// assistant is bound it is recreated with the reduced id list; if none
    /// ever was, removal is purely local.
    pub async fn detach(
        &self,
        owner: &OwnerId,
        chat_id: ConversationId,
        display_name: &str,
    ) -> Result<Option<String>, BindingError> {
        let conversation = self
            .repository
            .get_conversation(owner, chat_id)
            .await?
            .ok_or(BindingError::NotFound)?;
        ensure_unique_file_ids(&conversation.files)?;

        let Some(index) = conversation.attachment_index_by_name(display_name) else {
            tracing::debug!(
                conversation_id = %chat_id,
                "Detach of unknown file name, nothing to do"
            );
            return Ok(conversation.assistant_id);
        };

        let mut staged = conversation;
        staged.files.remove(index);

        if staged.assistant_id.is_some() {
            // Detaching the last file still recreates the assistant, with an
            // empty file list. The kept binding is inert for run selection
            // until a file is attached again.
            let assistant_id = self
                .model_service
                .create_assistant(&staged.file_ids())
                .await?;
            staged.assistant_id = Some(assistant_id);
        }

        self.repository
            .update_file_binding(owner, staged.id, &staged.files, staged.assistant_id.as_deref())
            .await?;

        tracing::info!(
            conversation_id = %chat_id,
            display_name = %display_name,
            file_count = staged.files.len(),
            "File detached"
        );

        Ok(staged.assistant_id)
    }
}

fn ensure_unique_file_ids(files: &[FileAttachment]) -> Result<(), BindingError> {
    let mut seen = HashSet::new();
    for attachment in files {
        if !seen.insert(attachment.file_id.as_str()) {
            return Err(BindingError::InvariantViolation(format!(
                "duplicate file id {} in attachment list",
                attachment.file_id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("conversation not found")]
    NotFound,
    #[error("remote service: {0}")]
    Remote(#[from] ModelServiceError),
    #[error("repository: {0}")]
    Repository(#[from] RepositoryError),
    #[error("file attachment invariant violated: {0}")]
    InvariantViolation(String),
}
