mod conversation;
mod conversation_id;
mod file_attachment;
mod message;
mod message_id;
mod message_role;
mod owner_id;
mod run;

pub use conversation::Conversation;
pub use conversation_id::ConversationId;
pub use file_attachment::FileAttachment;
pub use message::Message;
pub use message_id::MessageId;
pub use message_role::MessageRole;
pub use owner_id::OwnerId;
pub use run::RunStatus;
