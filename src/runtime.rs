//! Runtime for the conversation controller
//!
//! One cooperative event loop owns the controller state and the conversation
//! store. The presentation layer talks to it through a [`WidgetHandle`]:
//! commands go in over a channel, snapshots come out over a `watch`.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ConversationRuntime;
pub use traits::*;

use crate::context::SiteContextLoader;
use crate::conversation::ConversationSnapshot;
use crate::state_machine::TransitionError;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime =
    ConversationRuntime<SiteContextLoader, ServiceGenerationClient, SiteTranscriptLogger>;

/// Requests from the presentation layer
#[derive(Debug)]
pub enum Command {
    SendMessage {
        text: String,
        reply: oneshot::Sender<Result<SendOutcome, TransitionError>>,
    },
    SetDraft(String),
    ToggleOpen,
    SetOpen(bool),
}

/// What an accepted send did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Generation call issued
    Dispatched,
    /// Instruction not loaded; a local notice was shown instead
    NotReady,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("chat widget has been torn down")]
    Stopped,
}

/// Handle to interact with a running widget
#[derive(Clone)]
pub struct WidgetHandle {
    command_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<ConversationSnapshot>,
    shutdown: CancellationToken,
}

impl WidgetHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        snapshot_rx: watch::Receiver<ConversationSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            command_tx,
            snapshot_rx,
            shutdown,
        }
    }

    /// Submit `text` as a user message.
    ///
    /// Resolves once the controller has accepted or rejected it, not when
    /// the reply arrives.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<SendOutcome, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::SendMessage {
            text: text.into(),
            reply,
        })
        .await?;
        Ok(rx.await.map_err(|_| ControllerError::Stopped)??)
    }

    pub async fn set_draft(&self, draft: impl Into<String>) -> Result<(), ControllerError> {
        self.command(Command::SetDraft(draft.into())).await
    }

    pub async fn toggle_open(&self) -> Result<(), ControllerError> {
        self.command(Command::ToggleOpen).await
    }

    pub async fn set_open(&self, open: bool) -> Result<(), ControllerError> {
        self.command(Command::SetOpen(open)).await
    }

    async fn command(&self, command: Command) -> Result<(), ControllerError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ControllerError::Stopped)
    }

    /// Latest published state
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Tear the widget down, abandoning any in-flight generation
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
