use std::sync::Arc;

use crate::application::ports::{ConversationRepository, ModelService};
use crate::application::services::{ContinuationService, FileBindingService};
use crate::presentation::config::Settings;

pub struct AppState<M>
where
    M: ModelService,
{
    pub continuation_service: Arc<ContinuationService<M>>,
    pub file_binding_service: Arc<FileBindingService<M>>,
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub settings: Settings,
}

impl<M> Clone for AppState<M>
where
    M: ModelService,
{
    fn clone(&self) -> Self {
        Self {
            continuation_service: Arc::clone(&self.continuation_service),
            file_binding_service: Arc::clone(&self.file_binding_service),
            conversation_repository: Arc::clone(&self.conversation_repository),
            settings: self.settings.clone(),
        }
    }
}
