//! Conversation runtime executor

use super::traits::{ContextLoader, GenerationClient, TranscriptLogger};
use super::{Command, SendOutcome, WidgetHandle};

use crate::conversation::{ConversationSnapshot, ConversationStore, MessageId};
use crate::state_machine::{transition, ConvState, Effect, Event, TransitionError};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const CHANNEL_CAPACITY: usize = 32;

/// Generic conversation runtime that can work with any context, generation,
/// and logging implementations
pub struct ConversationRuntime<C, G, L>
where
    C: ContextLoader + 'static,
    G: GenerationClient + 'static,
    L: TranscriptLogger + 'static,
{
    state: ConvState,
    store: ConversationStore,
    context_loader: Arc<C>,
    generation: Arc<G>,
    logger: Arc<L>,
    command_rx: mpsc::Receiver<Command>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    snapshot_tx: watch::Sender<ConversationSnapshot>,
    /// Cancelled on teardown; in-flight generation is abandoned
    shutdown: CancellationToken,
}

impl<C, G, L> ConversationRuntime<C, G, L>
where
    C: ContextLoader + 'static,
    G: GenerationClient + 'static,
    L: TranscriptLogger + 'static,
{
    pub fn new(context_loader: C, generation: G, logger: L) -> (Self, WidgetHandle) {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let store = ConversationStore::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(store.snapshot());
        let shutdown = CancellationToken::new();

        let runtime = Self {
            state: ConvState::Idle,
            store,
            context_loader: Arc::new(context_loader),
            generation: Arc::new(generation),
            logger: Arc::new(logger),
            command_rx,
            event_rx,
            event_tx,
            snapshot_tx,
            shutdown: shutdown.clone(),
        };
        let handle = WidgetHandle::new(command_tx, snapshot_rx, shutdown);
        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!("Mounting chat widget");
        self.spawn_context_load();

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::warn!(error = %e, state = self.state.name(), "Dropped event");
                    }
                }

                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        // Abandon anything still in flight
        self.shutdown.cancel();
        tracing::info!(
            messages = self.store.messages().len(),
            "Chat widget torn down"
        );
    }

    /// Load the system instruction, exactly once per mount
    fn spawn_context_load(&self) {
        let loader = self.context_loader.clone();
        let event_tx = self.event_tx.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => {}
                result = loader.load() => match result {
                    Ok(instruction) => {
                        let _ = event_tx.send(Event::ContextLoaded { instruction }).await;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "System instruction unavailable, sends are blocked");
                    }
                },
            }
        });
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SendMessage { text, reply } => {
                let result = self.send_message(text);
                let _ = reply.send(result);
            }
            Command::SetDraft(draft) => {
                self.store.set_draft(draft);
                self.publish();
            }
            Command::ToggleOpen => {
                self.store.toggle_open();
                self.publish();
            }
            Command::SetOpen(open) => {
                self.store.set_open(open);
                self.publish();
            }
        }
    }

    fn send_message(&mut self, text: String) -> Result<SendOutcome, TransitionError> {
        let outcome = if self.state == ConvState::Idle {
            SendOutcome::NotReady
        } else {
            SendOutcome::Dispatched
        };

        match self.process_event(Event::user_message(text)) {
            Ok(()) => Ok(outcome),
            Err(e) => {
                tracing::debug!(error = %e, state = self.state.name(), "Send rejected");
                Err(e)
            }
        }
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        // Pure state transition
        let result = transition(&self.state, event)?;

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state != self.state {
            tracing::debug!(
                from = old_state.name(),
                to = self.state.name(),
                "State transition"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish();
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { message } => {
                if let Err(e) = self.store.append(message) {
                    tracing::error!(error = %e, "Failed to append message");
                }
            }

            Effect::ResolveMessage {
                id,
                content,
                status,
            } => {
                if let Err(e) = self.store.resolve(id, content, status) {
                    tracing::error!(error = %e, "Failed to resolve reply");
                }
            }

            Effect::ClearDraft => self.store.clear_draft(),

            Effect::InstallInstruction { instruction } => {
                if let Err(e) = self.store.install_instruction(instruction) {
                    tracing::error!(error = %e, "Failed to install system instruction");
                }
            }

            Effect::RequestGeneration { reply_id } => self.request_generation(reply_id),

            Effect::LogTranscript => self.log_transcript(),
        }
    }

    /// Spawn the generation call; the outcome comes back as an event
    fn request_generation(&self, reply_id: MessageId) {
        let Some(instruction) = self.store.system_instruction().cloned() else {
            tracing::error!(reply_id = %reply_id, "Generation requested without an instruction");
            let failed = Event::GenerationFailed {
                reply_id,
                message: "System not ready".to_string(),
            };
            if self.event_tx.try_send(failed).is_err() {
                tracing::error!("Event channel full, reply stays pending");
            }
            return;
        };

        let history = self.store.history();
        let client = self.generation.clone();
        let event_tx = self.event_tx.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tracing::info!(
                reply_id = %reply_id,
                messages = history.len(),
                "Requesting generation"
            );

            let event = tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    tracing::info!(reply_id = %reply_id, "Generation abandoned");
                    return;
                }

                result = client.generate(&history, &instruction) => match result {
                    Ok(text) => Event::GenerationComplete { reply_id, text },
                    Err(e) => Event::GenerationFailed { reply_id, message: e.message },
                },
            };

            let _ = event_tx.send(event).await;
        });
    }

    /// Fire-and-forget transcript logging; never reports back
    fn log_transcript(&self) {
        let messages = self.store.messages().to_vec();
        let logger = self.logger.clone();

        tokio::spawn(async move {
            if let Err(e) = logger.log(&messages, Utc::now()).await {
                tracing::warn!(error = %e, "Failed to log chat transcript");
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.store.snapshot());
    }
}
