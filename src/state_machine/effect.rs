//! Effects produced by state transitions

use crate::conversation::{Message, MessageId, MessageStatus, SystemInstruction};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the log
    AppendMessage { message: Message },

    /// Settle the pending reply `id`
    ResolveMessage {
        id: MessageId,
        content: String,
        status: MessageStatus,
    },

    ClearDraft,

    /// Store the system instruction (set once)
    InstallInstruction { instruction: SystemInstruction },

    /// Call the generation service with the current history
    RequestGeneration { reply_id: MessageId },

    /// Post the full transcript to the logging endpoint (fire-and-forget)
    LogTranscript,
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    pub fn resolve_reply(id: MessageId, content: impl Into<String>) -> Self {
        Effect::ResolveMessage {
            id,
            content: content.into(),
            status: MessageStatus::Resolved,
        }
    }

    pub fn fail_reply(id: MessageId, content: impl Into<String>) -> Self {
        Effect::ResolveMessage {
            id,
            content: content.into(),
            status: MessageStatus::Errored,
        }
    }
}
