//! Terminal presentation of the chat widget
//!
//! Reads published snapshots and turns key presses into controller
//! commands. Owns nothing but the local input buffer and scroll position.

mod input;
mod markdown;
mod render;
mod scroll;

use crate::runtime::{ControllerError, SendOutcome, WidgetHandle};
use crossterm::event::{Event, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use input::{map_key, Action};
use ratatui::DefaultTerminal;
use render::View;
use scroll::ScrollState;
use std::io;
use std::time::Duration;

const TYPING_FRAME: Duration = Duration::from_millis(350);

/// Take over the terminal and run the widget until the user quits
pub async fn run(handle: WidgetHandle, assistant_name: &str) -> io::Result<()> {
    let mut terminal = ratatui::try_init()?;
    let result = ChatApp::new(handle, assistant_name).run(&mut terminal).await;
    ratatui::try_restore()?;
    result
}

struct ChatApp {
    handle: WidgetHandle,
    assistant_name: String,
    input: String,
    scroll: ScrollState,
    frame: usize,
}

impl ChatApp {
    fn new(handle: WidgetHandle, assistant_name: &str) -> Self {
        Self {
            handle,
            assistant_name: assistant_name.to_string(),
            input: String::new(),
            scroll: ScrollState::default(),
            frame: 0,
        }
    }

    async fn run(mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        let mut events = EventStream::new();
        let mut snapshots = self.handle.subscribe();
        let mut tick = tokio::time::interval(TYPING_FRAME);

        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            self.scroll.observe(snapshot.message_revision);

            terminal.draw(|frame| {
                let view = View {
                    snapshot: &snapshot,
                    assistant_name: &self.assistant_name,
                    input: &self.input,
                    frame: self.frame,
                };
                render::draw(frame, &view, &mut self.scroll);
            })?;

            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key, snapshot.is_open, snapshot.is_loading).await {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => break,
                },

                _ = tick.tick(), if snapshot.is_loading => {
                    self.frame = self.frame.wrapping_add(1);
                }
            }
        }

        Ok(())
    }

    /// Returns true when the app should exit
    async fn handle_key(&mut self, key: KeyEvent, is_open: bool, is_loading: bool) -> bool {
        let Some(action) = map_key(key, is_open, is_loading) else {
            return false;
        };

        let result = match action {
            Action::Quit => return true,
            Action::ToggleOpen => self.handle.toggle_open().await,
            Action::Minimise => self.handle.set_open(false).await,
            Action::PageUp => {
                self.scroll.page_up();
                Ok(())
            }
            Action::PageDown => {
                self.scroll.page_down();
                Ok(())
            }
            Action::Submit => self.submit().await,
            Action::InsertNewline => self.edit(|input| input.push('\n')).await,
            Action::InsertChar(c) => self.edit(|input| input.push(c)).await,
            Action::Backspace => {
                self.edit(|input| {
                    input.pop();
                })
                .await
            }
        };

        matches!(result, Err(ControllerError::Stopped))
    }

    async fn edit(&mut self, f: impl FnOnce(&mut String)) -> Result<(), ControllerError> {
        f(&mut self.input);
        self.handle.set_draft(self.input.clone()).await
    }

    async fn submit(&mut self) -> Result<(), ControllerError> {
        match self.handle.send_message(self.input.clone()).await {
            Ok(SendOutcome::Dispatched) => {
                // The store cleared its draft as part of the send
                self.input.clear();
                Ok(())
            }
            Ok(SendOutcome::NotReady) => Ok(()),
            Err(ControllerError::Rejected(e)) => {
                tracing::debug!(error = %e, "Submit ignored");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
