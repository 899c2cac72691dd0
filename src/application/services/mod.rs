mod continuation_service;
mod file_binding_service;
mod run_engine;

pub use continuation_service::{ContinuationService, TurnError, TurnReply};
pub use file_binding_service::{AttachOutcome, BindingError, FileBindingService};
pub use run_engine::{RunEngine, RunError};
