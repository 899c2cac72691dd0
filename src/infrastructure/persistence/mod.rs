mod memory_conversation_repository;
mod pg_conversation_repository;

pub use memory_conversation_repository::InMemoryConversationRepository;
pub use pg_conversation_repository::PgConversationRepository;
