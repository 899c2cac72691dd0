mod mock_model_service;
mod openai_model_service;

pub use mock_model_service::MockModelService;
pub use openai_model_service::OpenAiModelService;
