//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::context::ContextLoadError;
use crate::conversation::{ConversationSnapshot, Message, SystemInstruction};
use crate::llm::{GenerationError, GenerationRequest, GenerationResponse, GenerationService};
use crate::site::SiteError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

// ============================================================================
// Gate
// ============================================================================

/// Blocks callers until the test opens it
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn closed() -> Self {
        Self(Arc::new(Semaphore::new(0)))
    }

    /// Let one waiting (or future) caller through
    pub fn open_once(&self) {
        self.0.add_permits(1);
    }

    async fn pass(&self) {
        if let Ok(permit) = self.0.acquire().await {
            permit.forget();
        }
    }
}

// ============================================================================
// Mock Context Loader
// ============================================================================

/// Context loader with a fixed outcome
pub struct MockContextLoader {
    instruction: Option<SystemInstruction>,
    gate: Option<Gate>,
    pub calls: AtomicUsize,
}

impl MockContextLoader {
    pub fn ready(text: &str) -> Self {
        Self {
            instruction: SystemInstruction::new(text),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Both sources fail
    pub fn unavailable() -> Self {
        Self {
            instruction: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Hold the load until `gate` opens
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl ContextLoader for MockContextLoader {
    async fn load(&self) -> Result<SystemInstruction, ContextLoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.instruction.clone().ok_or(ContextLoadError {
            primary: SiteError::MissingField("systemInstruction"),
            fallback: SiteError::MissingField("text"),
        })
    }
}

// ============================================================================
// Mock Generation Client
// ============================================================================

/// A recorded generation call
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub history: Vec<Message>,
    pub instruction: SystemInstruction,
}

/// Generation client that returns queued replies
pub struct MockGenerationClient {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    gate: Option<Gate>,
    calls: Mutex<Vec<GenerationCall>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold every call until `gate` opens
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_error(&self, error: GenerationError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    async fn generate(
        &self,
        history: &[Message],
        instruction: &SystemInstruction,
    ) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(GenerationCall {
            history: history.to_vec(),
            instruction: instruction.clone(),
        });
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::network("No mock reply queued")))
    }
}

/// Provider that never answers in time
pub struct SlowService {
    pub delay: Duration,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

#[async_trait]
impl GenerationService for SlowService {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        Ok(GenerationResponse {
            text: "too late".to_string(),
        })
    }

    fn model_id(&self) -> &str {
        "slow"
    }
}

// ============================================================================
// Mock Transcript Logger
// ============================================================================

/// Logger that records entries, optionally failing or holding every call
#[derive(Default)]
pub struct RecordingLogger {
    fail: bool,
    gate: Option<Gate>,
    entries: Mutex<Vec<(Vec<Message>, DateTime<Utc>)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Record each call, then hold it until `gate` opens
    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn entries(&self) -> Vec<(Vec<Message>, DateTime<Utc>)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptLogger for RecordingLogger {
    async fn log(&self, messages: &[Message], timestamp: DateTime<Utc>) -> Result<(), LogError> {
        self.entries
            .lock()
            .unwrap()
            .push((messages.to_vec(), timestamp));
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if self.fail {
            return Err(LogError {
                message: "log endpoint down".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Test Runtime Builder
// ============================================================================

use crate::runtime::{ConversationRuntime, WidgetHandle};

const WAIT: Duration = Duration::from_secs(2);

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime<G: GenerationClient + 'static> {
    pub handle: WidgetHandle,
    pub context: Arc<MockContextLoader>,
    pub generation: Arc<G>,
    pub logger: Arc<RecordingLogger>,
    pub task: tokio::task::JoinHandle<()>,
}

pub struct TestRuntimeBuilder<G> {
    context: MockContextLoader,
    generation: G,
    logger: RecordingLogger,
}

impl TestRuntimeBuilder<MockGenerationClient> {
    pub fn new() -> Self {
        Self {
            context: MockContextLoader::ready("Be concise."),
            generation: MockGenerationClient::new(),
            logger: RecordingLogger::new(),
        }
    }
}

impl<G: GenerationClient + 'static> TestRuntimeBuilder<G> {
    pub fn context(mut self, context: MockContextLoader) -> Self {
        self.context = context;
        self
    }

    pub fn generation<H: GenerationClient + 'static>(self, generation: H) -> TestRuntimeBuilder<H> {
        TestRuntimeBuilder {
            context: self.context,
            generation,
            logger: self.logger,
        }
    }

    pub fn logger(mut self, logger: RecordingLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn build(self) -> TestRuntime<G> {
        let context = Arc::new(self.context);
        let generation = Arc::new(self.generation);
        let logger = Arc::new(self.logger);

        let (runtime, handle) =
            ConversationRuntime::new(context.clone(), generation.clone(), logger.clone());
        let task = tokio::spawn(runtime.run());

        TestRuntime {
            handle,
            context,
            generation,
            logger,
            task,
        }
    }
}

impl<G: GenerationClient + 'static> TestRuntime<G> {
    /// Wait until the published snapshot satisfies `pred`
    pub async fn wait_for(
        &self,
        pred: impl FnMut(&ConversationSnapshot) -> bool,
    ) -> ConversationSnapshot {
        let mut rx = self.handle.subscribe();
        let snapshot = tokio::time::timeout(WAIT, rx.wait_for(pred))
            .await
            .expect("timed out waiting for snapshot")
            .expect("runtime stopped");
        snapshot.clone()
    }

    pub async fn wait_ready(&self) -> ConversationSnapshot {
        self.wait_for(|s| s.ready).await
    }

    /// Wait until a send has fully resolved
    pub async fn wait_settled(&self, messages: usize) -> ConversationSnapshot {
        self.wait_for(|s| !s.is_loading && s.messages.len() == messages)
            .await
    }

    /// Poll the logger until it has `count` entries
    pub async fn wait_for_logs(&self, count: usize) -> Vec<(Vec<Message>, DateTime<Utc>)> {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let entries = self.logger.entries();
            if entries.len() >= count || tokio::time::Instant::now() >= deadline {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MessageStatus, Role};
    use crate::runtime::{ControllerError, SendOutcome, ServiceGenerationClient};
    use crate::state_machine::TransitionError;

    fn contents(snapshot: &ConversationSnapshot) -> Vec<(Role, &str)> {
        snapshot
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_mount_send_reply_and_log() {
        let rt = TestRuntimeBuilder::new().build();
        rt.generation.queue_reply("Hello!");

        rt.wait_ready().await;
        rt.handle.set_draft("Hi").await.unwrap();
        let outcome = rt.handle.send_message("Hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::Dispatched);

        let snapshot = rt.wait_settled(2).await;
        assert_eq!(
            contents(&snapshot),
            vec![(Role::User, "Hi"), (Role::Assistant, "Hello!")]
        );
        assert_eq!(snapshot.messages[1].status, MessageStatus::Resolved);
        assert!(!snapshot.is_loading);
        assert_eq!(snapshot.draft, "");

        let calls = rt.generation.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].instruction.as_str(), "Be concise.");
        assert_eq!(calls[0].history.len(), 1);
        assert_eq!(calls[0].history[0].content, "Hi");

        let logs = rt.wait_for_logs(1).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0, snapshot.messages);

        assert_eq!(rt.context.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_placeholder_visible_while_sending() {
        let gate = Gate::closed();
        let rt = TestRuntimeBuilder::new()
            .generation(MockGenerationClient::new().gated(gate.clone()))
            .build();
        rt.generation.queue_reply("Hello!");
        rt.wait_ready().await;

        rt.handle.send_message("Hi").await.unwrap();
        let loading = rt.wait_for(|s| s.is_loading).await;
        assert_eq!(loading.messages.len(), 2);
        assert!(loading.messages[1].is_pending());

        gate.open_once();
        let done = rt.wait_settled(2).await;
        assert_eq!(done.messages[1].id, loading.messages[1].id);
        assert_eq!(done.messages[1].content, "Hello!");
    }

    #[tokio::test]
    async fn test_send_while_loading_is_ignored() {
        let gate = Gate::closed();
        let rt = TestRuntimeBuilder::new()
            .generation(MockGenerationClient::new().gated(gate.clone()))
            .build();
        rt.generation.queue_reply("first");
        rt.generation.queue_reply("second");
        rt.wait_ready().await;

        rt.handle.send_message("one").await.unwrap();
        rt.wait_for(|s| s.is_loading).await;

        let err = rt.handle.send_message("two").await.unwrap_err();
        assert_eq!(err, ControllerError::Rejected(TransitionError::Busy));
        assert_eq!(rt.handle.snapshot().messages.len(), 2);

        gate.open_once();
        let snapshot = rt.wait_settled(2).await;
        assert_eq!(
            contents(&snapshot),
            vec![(Role::User, "one"), (Role::Assistant, "first")]
        );
        assert_eq!(rt.generation.recorded_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_changes_nothing() {
        let rt = TestRuntimeBuilder::new().build();
        let before = rt.wait_ready().await;

        for text in ["", "   ", "\n\t"] {
            let err = rt.handle.send_message(text).await.unwrap_err();
            assert_eq!(err, ControllerError::Rejected(TransitionError::EmptyMessage));
        }

        assert_eq!(rt.handle.snapshot(), before);
        assert!(rt.generation.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_before_ready_shows_notice() {
        let rt = TestRuntimeBuilder::new()
            .context(MockContextLoader::unavailable())
            .build();

        rt.handle.set_draft("Hi").await.unwrap();
        let outcome = rt.handle.send_message("Hi").await.unwrap();
        assert_eq!(outcome, SendOutcome::NotReady);

        let snapshot = rt.handle.snapshot();
        assert_eq!(
            contents(&snapshot),
            vec![(Role::Assistant, "Initializing system...")]
        );
        assert!(!snapshot.is_loading);
        assert!(!snapshot.ready);
        assert_eq!(snapshot.draft, "Hi");
        assert!(rt.generation.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn test_becomes_ready_after_slow_context() {
        let gate = Gate::closed();
        let rt = TestRuntimeBuilder::new()
            .context(MockContextLoader::ready("Be concise.").gated(gate.clone()))
            .build();
        rt.generation.queue_reply("Hello!");

        assert_eq!(
            rt.handle.send_message("early").await.unwrap(),
            SendOutcome::NotReady
        );

        gate.open_once();
        rt.wait_ready().await;
        assert_eq!(
            rt.handle.send_message("Hi").await.unwrap(),
            SendOutcome::Dispatched
        );

        let snapshot = rt.wait_settled(3).await;
        assert_eq!(
            contents(&snapshot),
            vec![
                (Role::Assistant, "Initializing system..."),
                (Role::User, "Hi"),
                (Role::Assistant, "Hello!"),
            ]
        );
        // The notice is part of the history the service sees
        assert_eq!(rt.generation.recorded_calls()[0].history.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_reply_falls_back() {
        let rt = TestRuntimeBuilder::new().build();
        rt.generation.queue_reply("");
        rt.wait_ready().await;

        rt.handle.send_message("Hi").await.unwrap();
        let snapshot = rt.wait_settled(2).await;

        assert_eq!(snapshot.messages[1].content, "No response.");
        assert_eq!(snapshot.messages[1].status, MessageStatus::Resolved);
    }

    #[tokio::test]
    async fn test_failure_is_inline_and_recoverable() {
        let rt = TestRuntimeBuilder::new().build();
        rt.generation.queue_error(GenerationError::network("timeout"));
        rt.generation.queue_reply("Back again");
        rt.wait_ready().await;

        rt.handle.send_message("Hi").await.unwrap();
        let snapshot = rt.wait_settled(2).await;
        assert_eq!(snapshot.messages[1].content, "Error: timeout");
        assert_eq!(snapshot.messages[1].status, MessageStatus::Errored);

        rt.handle.send_message("Retry").await.unwrap();
        let snapshot = rt.wait_settled(4).await;
        assert_eq!(snapshot.messages[3].content, "Back again");

        // Only the successful reply is logged
        let logs = rt.wait_for_logs(1).await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].0.len(), 4);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_touch_conversation() {
        let rt = TestRuntimeBuilder::new()
            .logger(RecordingLogger::failing())
            .build();
        rt.generation.queue_reply("Hello!");
        rt.wait_ready().await;

        rt.handle.send_message("Hi").await.unwrap();
        let snapshot = rt.wait_settled(2).await;
        assert_eq!(rt.wait_for_logs(1).await.len(), 1);

        assert_eq!(rt.handle.snapshot(), snapshot);
        assert_eq!(snapshot.messages[1].content, "Hello!");
    }

    #[tokio::test]
    async fn test_held_log_does_not_block_next_send() {
        let gate = Gate::closed();
        let rt = TestRuntimeBuilder::new()
            .logger(RecordingLogger::new().gated(gate.clone()))
            .build();
        rt.generation.queue_reply("first");
        rt.generation.queue_reply("second");
        rt.wait_ready().await;

        rt.handle.send_message("one").await.unwrap();
        let snapshot = rt.wait_settled(2).await;
        assert!(!snapshot.is_loading);

        // The log call has started and is still held by the gate
        assert_eq!(rt.wait_for_logs(1).await.len(), 1);

        let outcome = rt.handle.send_message("two").await.unwrap();
        assert_eq!(outcome, SendOutcome::Dispatched);
        let snapshot = rt.wait_settled(4).await;
        assert_eq!(snapshot.messages[3].content, "second");

        gate.open_once();
        gate.open_once();
        assert_eq!(rt.wait_for_logs(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_generation_timeout_resolves_to_error() {
        let service = Arc::new(SlowService {
            delay: Duration::from_secs(30),
            requests: Mutex::new(Vec::new()),
        });
        let client = ServiceGenerationClient::new(service.clone(), Duration::from_millis(50));
        let rt = TestRuntimeBuilder::new().generation(client).build();
        rt.wait_ready().await;

        rt.handle.send_message("Hi").await.unwrap();
        let snapshot = rt.wait_settled(2).await;

        assert!(snapshot.messages[1]
            .content
            .starts_with("Error: Request timed out"));
        assert_eq!(snapshot.messages[1].status, MessageStatus::Errored);
        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].history_text, "User: Hi");
        assert_eq!(requests[0].system_instruction, "Be concise.");
    }

    #[tokio::test]
    async fn test_widget_flags_are_published() {
        let rt = TestRuntimeBuilder::new().build();

        rt.handle.toggle_open().await.unwrap();
        rt.wait_for(|s| s.is_open).await;
        rt.handle.set_draft("draft").await.unwrap();
        rt.wait_for(|s| s.draft == "draft").await;
        rt.handle.set_open(false).await.unwrap();
        rt.wait_for(|s| !s.is_open).await;
    }

    #[tokio::test]
    async fn test_shutdown_abandons_inflight_generation() {
        let gate = Gate::closed();
        let rt = TestRuntimeBuilder::new()
            .generation(MockGenerationClient::new().gated(gate))
            .build();
        rt.wait_ready().await;
        rt.handle.send_message("Hi").await.unwrap();
        rt.wait_for(|s| s.is_loading).await;

        rt.handle.shutdown();
        tokio::time::timeout(WAIT, rt.task)
            .await
            .expect("runtime should stop")
            .unwrap();

        assert_eq!(
            rt.handle.send_message("again").await.unwrap_err(),
            ControllerError::Stopped
        );
    }
}
