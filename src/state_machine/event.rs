//! Events that can occur in a conversation

use crate::conversation::{MessageId, SystemInstruction};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Context loader resolved at mount
    ContextLoaded { instruction: SystemInstruction },

    /// User submitted text. Both ids are minted by the caller so the
    /// transition stays pure.
    UserMessage {
        text: String,
        message_id: MessageId,
        reply_id: MessageId,
    },

    GenerationComplete {
        reply_id: MessageId,
        text: String,
    },
    GenerationFailed {
        reply_id: MessageId,
        message: String,
    },
}

impl Event {
    /// Build a user message event with freshly minted ids
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage {
            text: text.into(),
            message_id: MessageId::new(),
            reply_id: MessageId::new(),
        }
    }
}
