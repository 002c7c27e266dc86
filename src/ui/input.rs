//! Key bindings and input box sizing

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Maximum text rows the input box grows to
pub const MAX_INPUT_ROWS: u16 = 6;

/// Logical actions, independent of key binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleOpen,
    Minimise,
    Quit,
    Submit,
    InsertNewline,
    InsertChar(char),
    Backspace,
    PageUp,
    PageDown,
}

/// Map a key press to an [`Action`].
///
/// Editing and submit keys are ignored while a reply is loading, and
/// everything but the global bindings is ignored while the widget is closed.
pub fn map_key(event: KeyEvent, is_open: bool, is_loading: bool) -> Option<Action> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let shift = event.modifiers.contains(KeyModifiers::SHIFT);

    match event.code {
        KeyCode::Char('c') if ctrl => return Some(Action::Quit),
        KeyCode::Char('t') if ctrl => return Some(Action::ToggleOpen),
        _ => {}
    }

    if !is_open {
        return None;
    }

    match event.code {
        KeyCode::Esc => Some(Action::Minimise),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        _ if is_loading => None,
        KeyCode::Enter if shift || alt => Some(Action::InsertNewline),
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c) if !ctrl && !alt => Some(Action::InsertChar(c)),
        _ => None,
    }
}

/// Wrap `text` into rows of at most `width` characters, breaking at spaces
/// where possible. Always yields at least one row.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let mut row = String::new();
        let mut col = 0;
        for word in line.split_inclusive(' ') {
            let len = word.chars().count();
            if col + len > width && col > 0 {
                rows.push(std::mem::take(&mut row));
                col = 0;
            }
            if len > width {
                for ch in word.chars() {
                    if col == width {
                        rows.push(std::mem::take(&mut row));
                        col = 0;
                    }
                    row.push(ch);
                    col += 1;
                }
            } else {
                row.push_str(word);
                col += len;
            }
        }
        rows.push(row);
    }
    rows
}

/// Rows the input box needs for `draft`, clamped to [`MAX_INPUT_ROWS`]
pub fn input_height(draft: &str, width: u16) -> u16 {
    let rows = wrap(draft, usize::from(width)).len();
    u16::try_from(rows).map_or(MAX_INPUT_ROWS, |rows| rows.clamp(1, MAX_INPUT_ROWS))
}
