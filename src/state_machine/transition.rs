//! Pure state transition function
//!
//! Given the same state and event this always produces the same result and
//! performs no I/O. Rejected events leave the conversation untouched.

use super::{ConvState, Effect, Event};
use crate::conversation::Message;
use thiserror::Error;

/// Shown when the user sends before the system instruction has loaded
pub const INITIALIZING_NOTICE: &str = "Initializing system...";

/// Reply content when the service succeeds with empty text
pub const EMPTY_REPLY_FALLBACK: &str = "No response.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is already in progress")]
    Busy,
    #[error("System instruction is already loaded")]
    InstructionAlreadyLoaded,
    #[error("Reply does not match the pending request")]
    StaleReply,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Format the user-visible content of a failed reply
pub fn error_content(message: &str) -> String {
    format!("Error: {message}")
}

/// Pure transition function
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Mount
        // ============================================================
        (ConvState::Idle, Event::ContextLoaded { instruction }) => {
            Ok(TransitionResult::new(ConvState::Ready)
                .with_effect(Effect::InstallInstruction { instruction }))
        }

        (_, Event::ContextLoaded { .. }) => Err(TransitionError::InstructionAlreadyLoaded),

        // ============================================================
        // User messages
        // ============================================================
        (_, Event::UserMessage { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Not ready: local notice only, the service is never contacted
        (ConvState::Idle, Event::UserMessage { reply_id, .. }) => {
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::append(Message::assistant(reply_id, INITIALIZING_NOTICE))))
        }

        (
            ConvState::Ready,
            Event::UserMessage {
                text,
                message_id,
                reply_id,
            },
        ) => Ok(TransitionResult::new(ConvState::Sending { reply_id })
            .with_effect(Effect::append(Message::user(message_id, text)))
            .with_effect(Effect::ClearDraft)
            .with_effect(Effect::append(Message::pending(reply_id)))
            .with_effect(Effect::RequestGeneration { reply_id })),

        (ConvState::Sending { .. }, Event::UserMessage { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Generation outcome
        // ============================================================
        (ConvState::Sending { reply_id }, Event::GenerationComplete { reply_id: id, text })
            if *reply_id == id =>
        {
            let content = if text.is_empty() {
                EMPTY_REPLY_FALLBACK.to_string()
            } else {
                text
            };
            Ok(TransitionResult::new(ConvState::Ready)
                .with_effect(Effect::resolve_reply(id, content))
                .with_effect(Effect::LogTranscript))
        }

        (ConvState::Sending { reply_id }, Event::GenerationFailed { reply_id: id, message })
            if *reply_id == id =>
        {
            Ok(TransitionResult::new(ConvState::Ready)
                .with_effect(Effect::fail_reply(id, error_content(&message))))
        }

        (
            ConvState::Sending { .. },
            Event::GenerationComplete { .. } | Event::GenerationFailed { .. },
        ) => Err(TransitionError::StaleReply),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}
