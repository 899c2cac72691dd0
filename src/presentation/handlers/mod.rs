mod chat;
mod files;
mod health;
mod history;

use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub use chat::{continue_turn_handler, new_turn_handler};
pub use files::{attach_file_handler, detach_file_handler, list_files_handler};
pub use health::health_handler;
pub use history::{chat_index_handler, delete_all_handler, saved_messages_handler};
