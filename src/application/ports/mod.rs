mod conversation_repository;
mod model_service;
mod repository_error;

pub use conversation_repository::ConversationRepository;
pub use model_service::{ModelMessage, ModelService, ModelServiceError, TokenStream};
pub use repository_error::RepositoryError;
