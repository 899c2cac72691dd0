use serde::{Deserialize, Serialize};

/// A file grounding a conversation. The remote storage id and the user-facing
/// name travel as one record, so the two can never drift out of step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub file_id: String,
    pub display_name: String,
}

impl FileAttachment {
    pub fn new(file_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            display_name: display_name.into(),
        }
    }
}
