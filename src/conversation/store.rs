//! Conversation store
//!
//! Append-only message log. The only in-place mutation allowed is resolving
//! the single outstanding pending reply.

use super::message::{Message, MessageId, MessageStatus, SystemInstruction};
use thiserror::Error;

/// Errors raised when a store invariant would be violated
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("a reply is already pending")]
    PendingOutstanding,
    #[error("no message with id {0}")]
    UnknownMessage(MessageId),
    #[error("message {0} is not pending")]
    NotPending(MessageId),
    #[error("system instruction is already loaded")]
    InstructionAlreadySet,
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub draft: String,
    pub is_open: bool,
    pub is_loading: bool,
    /// System instruction has been loaded
    pub ready: bool,
    /// Bumped whenever the message list changes
    pub message_revision: u64,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    draft: String,
    is_open: bool,
    system_instruction: Option<SystemInstruction>,
    message_revision: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages visible to the generation service (everything but the pending reply)
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| !m.is_pending())
            .cloned()
            .collect()
    }

    pub fn pending(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_pending())
    }

    pub fn is_loading(&self) -> bool {
        self.pending().is_some()
    }

    pub fn append(&mut self, message: Message) -> Result<MessageId, StoreError> {
        if message.is_pending() && self.is_loading() {
            return Err(StoreError::PendingOutstanding);
        }
        let id = message.id;
        self.messages.push(message);
        self.message_revision += 1;
        Ok(id)
    }

    /// Replace the content of the pending message `id`.
    pub fn resolve(
        &mut self,
        id: MessageId,
        content: String,
        status: MessageStatus,
    ) -> Result<(), StoreError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::UnknownMessage(id))?;
        if !message.is_pending() {
            return Err(StoreError::NotPending(id));
        }
        message.content = content;
        message.status = status;
        self.message_revision += 1;
        Ok(())
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: String) {
        self.draft = draft;
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn set_open(&mut self, open: bool) {
        self.is_open = open;
    }

    pub fn toggle_open(&mut self) {
        self.is_open = !self.is_open;
    }

    pub fn system_instruction(&self) -> Option<&SystemInstruction> {
        self.system_instruction.as_ref()
    }

    pub fn install_instruction(&mut self, instruction: SystemInstruction) -> Result<(), StoreError> {
        if self.system_instruction.is_some() {
            return Err(StoreError::InstructionAlreadySet);
        }
        self.system_instruction = Some(instruction);
        Ok(())
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: self.messages.clone(),
            draft: self.draft().to_string(),
            is_open: self.is_open(),
            is_loading: self.is_loading(),
            ready: self.system_instruction.is_some(),
            message_revision: self.message_revision,
        }
    }
}
