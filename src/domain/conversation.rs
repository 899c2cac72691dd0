use chrono::{DateTime, Utc};

use super::{ConversationId, FileAttachment, Message, OwnerId};

/// The persisted unit of a user's chat session: append-only history, ordered
/// file attachments, and an optional binding to a remote stateful assistant.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: ConversationId,
    pub owner: OwnerId,
    pub history: Vec<Message>,
    pub files: Vec<FileAttachment>,
    pub assistant_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(owner: OwnerId) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            owner,
            history: Vec::new(),
            files: Vec::new(),
            assistant_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The assistant binding usable for a stateful run. A binding left over
    /// from a conversation whose files were all detached is inert: new runs
    /// must fall back to stateless completion.
    pub fn grounded_assistant_id(&self) -> Option<&str> {
        if self.files.is_empty() {
            return None;
        }
        self.assistant_id.as_deref()
    }

    pub fn file_ids(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_id.clone()).collect()
    }

    pub fn has_file(&self, file_id: &str) -> bool {
        self.files.iter().any(|f| f.file_id == file_id)
    }

    pub fn attachment_index_by_name(&self, display_name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.display_name == display_name)
    }
}
