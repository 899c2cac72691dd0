use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use sibu::application::ports::{ModelMessage, ModelService, ModelServiceError, TokenStream};
use sibu::application::services::{RunEngine, RunError};
use sibu::domain::{Conversation, FileAttachment, Message, MessageRole, OwnerId, RunStatus};

const TEST_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const TEST_POLL_MAX_ATTEMPTS: u32 = 5;

/// Records every remote call so tests can assert which path the engine took
/// and exactly what went over the wire.
struct RecordingModelService {
    stream_fragments: Vec<Result<String, String>>,
    run_statuses: Mutex<Vec<RunStatus>>,
    thread_messages: Vec<String>,
    stream_calls: AtomicUsize,
    thread_calls: AtomicUsize,
    run_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    captured_completions: Mutex<Vec<Vec<ModelMessage>>>,
}

impl RecordingModelService {
    fn streaming(fragments: &[&str]) -> Self {
        Self {
            stream_fragments: fragments.iter().map(|f| Ok(f.to_string())).collect(),
            run_statuses: Mutex::new(Vec::new()),
            thread_messages: Vec::new(),
            stream_calls: AtomicUsize::new(0),
            thread_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            captured_completions: Mutex::new(Vec::new()),
        }
    }

    fn stateful(statuses: &[RunStatus], thread_messages: &[&str]) -> Self {
        Self {
            stream_fragments: Vec::new(),
            run_statuses: Mutex::new(statuses.to_vec()),
            thread_messages: thread_messages.iter().map(|m| m.to_string()).collect(),
            stream_calls: AtomicUsize::new(0),
            thread_calls: AtomicUsize::new(0),
            run_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            captured_completions: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ModelService for RecordingModelService {
    async fn complete_stream(
        &self,
        messages: &[ModelMessage],
    ) -> Result<TokenStream, ModelServiceError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.captured_completions
            .lock()
            .await
            .push(messages.to_vec());
        let fragments: Vec<Result<String, ModelServiceError>> = self
            .stream_fragments
            .iter()
            .map(|f| {
                f.clone()
                    .map_err(ModelServiceError::ApiRequestFailed)
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(fragments)))
    }

    async fn create_assistant(&self, _file_ids: &[String]) -> Result<String, ModelServiceError> {
        Ok("asst_1".to_string())
    }

    async fn create_thread(
        &self,
        _seed_messages: &[ModelMessage],
    ) -> Result<String, ModelServiceError> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        Ok("thread_1".to_string())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<String, ModelServiceError> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        Ok("run_1".to_string())
    }

    async fn get_run(
        &self,
        _thread_id: &str,
        _run_id: &str,
    ) -> Result<RunStatus, ModelServiceError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.run_statuses.lock().await;
        if statuses.is_empty() {
            // never completes
            return Ok(RunStatus::InProgress);
        }
        Ok(statuses.remove(0))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<String>, ModelServiceError> {
        Ok(self.thread_messages.clone())
    }
}

fn engine(service: Arc<RecordingModelService>) -> RunEngine<RecordingModelService> {
    RunEngine::new(
        service,
        TEST_SYSTEM_PROMPT.to_string(),
        TEST_POLL_MAX_ATTEMPTS,
        Duration::from_millis(1),
    )
}

fn unbound_conversation() -> Conversation {
    Conversation::new(OwnerId::new("user-1"))
}

fn bound_conversation() -> Conversation {
    let mut conversation = Conversation::new(OwnerId::new("user-1"));
    conversation
        .files
        .push(FileAttachment::new("f1", "report.pdf"));
    conversation.assistant_id = Some("asst_1".to_string());
    conversation
}

#[tokio::test]
async fn given_empty_unbound_conversation_when_turn_then_single_stateless_call_with_system_and_prompt()
{
    let service = Arc::new(RecordingModelService::streaming(&["4"]));
    let engine = engine(Arc::clone(&service));

    let (prompt, reply) = engine
        .execute(&unbound_conversation(), "2+2?")
        .await
        .expect("turn should succeed");

    assert_eq!(service.stream_calls.load(Ordering::SeqCst), 1);
    let captured = service.captured_completions.lock().await;
    assert_eq!(
        captured[0],
        vec![
            ModelMessage::system(TEST_SYSTEM_PROMPT),
            ModelMessage::user("2+2?"),
        ]
    );
    assert_eq!(prompt.role, MessageRole::User);
    assert_eq!(prompt.content, "2+2?");
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.content, "4");
}

#[tokio::test]
async fn given_unbound_conversation_when_turn_then_no_thread_or_run_calls() {
    let service = Arc::new(RecordingModelService::streaming(&["hi"]));
    let engine = engine(Arc::clone(&service));

    engine
        .execute(&unbound_conversation(), "hello")
        .await
        .expect("turn should succeed");

    assert_eq!(service.thread_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.run_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.poll_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_prior_exchange_when_stateless_turn_then_history_resent_in_stored_order() {
    let service = Arc::new(RecordingModelService::streaming(&["fine"]));
    let engine = engine(Arc::clone(&service));

    let mut conversation = unbound_conversation();
    conversation.history.push(Message::new(
        conversation.id,
        MessageRole::User,
        "first question".to_string(),
    ));
    conversation.history.push(Message::new(
        conversation.id,
        MessageRole::Assistant,
        "first answer".to_string(),
    ));

    engine
        .execute(&conversation, "second question")
        .await
        .expect("turn should succeed");

    let captured = service.captured_completions.lock().await;
    assert_eq!(
        captured[0],
        vec![
            ModelMessage::system(TEST_SYSTEM_PROMPT),
            ModelMessage::user("first question"),
            ModelMessage {
                role: MessageRole::Assistant,
                content: "first answer".to_string(),
            },
            ModelMessage::user("second question"),
        ]
    );
}

#[tokio::test]
async fn given_stream_fragments_when_stateless_turn_then_fragments_concatenated_in_order() {
    let service = Arc::new(RecordingModelService::streaming(&["Hel", "", "lo!"]));
    let engine = engine(Arc::clone(&service));

    let (_, reply) = engine
        .execute(&unbound_conversation(), "greet me")
        .await
        .expect("turn should succeed");

    assert_eq!(reply.content, "Hello!");
}

#[tokio::test]
async fn given_bound_conversation_when_turn_then_no_streaming_call() {
    let service = Arc::new(RecordingModelService::stateful(
        &[RunStatus::Completed],
        &["bound answer"],
    ));
    let engine = engine(Arc::clone(&service));

    let (_, reply) = engine
        .execute(&bound_conversation(), "ask the files")
        .await
        .expect("turn should succeed");

    assert_eq!(service.stream_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.thread_calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.run_calls.load(Ordering::SeqCst), 1);
    assert_eq!(reply.content, "bound answer");
}

#[tokio::test]
async fn given_binding_without_files_when_turn_then_stateless_path_taken() {
    let service = Arc::new(RecordingModelService::streaming(&["ok"]));
    let engine = engine(Arc::clone(&service));

    // legacy binding with all files detached must not start stateful runs
    let mut conversation = unbound_conversation();
    conversation.assistant_id = Some("asst_stale".to_string());

    engine
        .execute(&conversation, "hello")
        .await
        .expect("turn should succeed");

    assert_eq!(service.thread_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.stream_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_run_completing_on_third_poll_when_stateful_turn_then_polls_exactly_three_times() {
    let service = Arc::new(RecordingModelService::stateful(
        &[RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed],
        &["latest reply", "older prompt echo"],
    ));
    let engine = engine(Arc::clone(&service));

    let (_, reply) = engine
        .execute(&bound_conversation(), "how long?")
        .await
        .expect("turn should succeed");

    assert_eq!(service.poll_calls.load(Ordering::SeqCst), 3);
    assert_eq!(reply.content, "latest reply");
}

#[tokio::test]
async fn given_run_that_never_completes_when_stateful_turn_then_times_out_after_budget() {
    let service = Arc::new(RecordingModelService::stateful(&[], &["unused"]));
    let engine = engine(Arc::clone(&service));

    let error = engine
        .execute(&bound_conversation(), "stuck?")
        .await
        .expect_err("turn should time out");

    match error {
        RunError::TimedOut { attempts } => assert_eq!(attempts, TEST_POLL_MAX_ATTEMPTS),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(
        service.poll_calls.load(Ordering::SeqCst),
        TEST_POLL_MAX_ATTEMPTS as usize
    );
}

#[tokio::test]
async fn given_run_failing_terminally_when_stateful_turn_then_remote_error() {
    let service = Arc::new(RecordingModelService::stateful(
        &[RunStatus::Queued, RunStatus::Failed],
        &["unused"],
    ));
    let engine = engine(Arc::clone(&service));

    let error = engine
        .execute(&bound_conversation(), "doomed")
        .await
        .expect_err("turn should fail");

    assert!(matches!(error, RunError::Remote(_)));
    assert_eq!(service.poll_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn given_failing_stream_when_stateless_turn_then_no_partial_reply() {
    let service = Arc::new(RecordingModelService {
        stream_fragments: vec![Ok("partial".to_string()), Err("connection reset".to_string())],
        run_statuses: Mutex::new(Vec::new()),
        thread_messages: Vec::new(),
        stream_calls: AtomicUsize::new(0),
        thread_calls: AtomicUsize::new(0),
        run_calls: AtomicUsize::new(0),
        poll_calls: AtomicUsize::new(0),
        captured_completions: Mutex::new(Vec::new()),
    });
    let engine = engine(Arc::clone(&service));

    let error = engine
        .execute(&unbound_conversation(), "hello")
        .await
        .expect_err("turn should fail");

    assert!(matches!(error, RunError::Remote(_)));
}
