//! Conversation controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The runtime executor applies the resulting effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::ConvState;
pub use transition::{transition, TransitionError};
