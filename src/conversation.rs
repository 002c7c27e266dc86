//! In-memory conversation state
//!
//! The ordered message log plus the transient widget flags (open/closed,
//! draft input). Owned exclusively by the runtime; the presentation layer
//! only sees [`ConversationSnapshot`]s.

mod message;
mod store;

pub use message::{Message, MessageId, MessageStatus, Role, SystemInstruction};
pub use store::{ConversationSnapshot, ConversationStore};
