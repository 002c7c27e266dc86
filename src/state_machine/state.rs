//! Conversation controller states

use crate::conversation::MessageId;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvState {
    /// Mounted, system instruction not loaded yet
    #[default]
    Idle,

    /// Instruction loaded, no generation call in flight
    Ready,

    /// One generation call in flight for the pending reply `reply_id`
    Sending { reply_id: MessageId },
}

impl ConvState {
    #[allow(dead_code)] // used by property tests
    pub fn is_sending(&self) -> bool {
        matches!(self, ConvState::Sending { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::Ready => "ready",
            ConvState::Sending { .. } => "sending",
        }
    }
}
