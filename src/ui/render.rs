//! Drawing the widget

use super::input::{input_height, wrap};
use super::markdown::{render_markdown, StyledLines};
use super::scroll::ScrollState;
use crate::conversation::{ConversationSnapshot, Message, MessageStatus, Role};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph};
use ratatui::Frame;

const BUBBLE_WIDTH: u16 = 22;
const BUBBLE_HEIGHT: u16 = 3;
const TYPING_FRAMES: [&str; 4] = ["•", "• •", "• • •", "• •"];

/// Everything the draw pass needs besides the scroll state
pub struct View<'a> {
    pub snapshot: &'a ConversationSnapshot,
    pub assistant_name: &'a str,
    /// Local input buffer
    pub input: &'a str,
    /// Animation frame for the typing indicator
    pub frame: usize,
}

pub fn draw(frame: &mut Frame, view: &View<'_>, scroll: &mut ScrollState) {
    let area = frame.area();
    if view.snapshot.is_open {
        draw_panel(frame, area, view, scroll);
    } else {
        draw_bubble(frame, area);
    }
}

/// Collapsed widget: a small button in the bottom-right corner
fn draw_bubble(frame: &mut Frame, area: Rect) {
    let width = BUBBLE_WIDTH.min(area.width);
    let height = BUBBLE_HEIGHT.min(area.height);
    let bubble = Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    };
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Blue));
    let label = Paragraph::new(Line::from(vec![
        Span::styled("Chat", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled("  Ctrl-T", Style::default().fg(Color::DarkGray)),
    ]))
    .centered()
    .block(block);

    frame.render_widget(Clear, bubble);
    frame.render_widget(label, bubble);
}

fn draw_panel(frame: &mut Frame, area: Rect, view: &View<'_>, scroll: &mut ScrollState) {
    let outer = Block::bordered().border_type(BorderType::Rounded);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let input_rows = input_height(view.input, inner.width.saturating_sub(2));
    let [header, transcript, input] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(input_rows + 2),
    ])
    .areas(inner);

    frame.render_widget(Paragraph::new(header_lines(view.assistant_name)), header);

    let lines = transcript_lines(
        view.snapshot,
        view.assistant_name,
        transcript.width,
        view.frame,
    );
    let offset = scroll.resolve(lines.len(), usize::from(transcript.height));
    frame.render_widget(
        Paragraph::new(Text::from(lines)).scroll((to_u16(offset), 0)),
        transcript,
    );

    draw_input(frame, input, view);
}

fn draw_input(frame: &mut Frame, area: Rect, view: &View<'_>) {
    let loading = view.snapshot.is_loading;
    let send_label = if loading { " ... " } else { " Enter to send " };
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title_bottom(Line::from(send_label).right_aligned())
        .border_style(if loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Blue)
        });
    let inner = block.inner(area);

    let rows = wrap(view.input, usize::from(inner.width));
    let hidden = rows.len().saturating_sub(usize::from(inner.height));
    let body = if view.input.is_empty() {
        Paragraph::new(Span::styled(
            "Type a message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let style = if loading {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        Paragraph::new(Text::from(
            rows.iter()
                .map(|row| Line::from(row.clone()))
                .collect::<Vec<_>>(),
        ))
        .style(style)
        .scroll((to_u16(hidden), 0))
    };
    frame.render_widget(body.block(block), area);

    if !loading {
        let last = rows.last().map_or(0, |row| row.chars().count());
        let x = inner.x + to_u16(last).min(inner.width.saturating_sub(1));
        let row = (rows.len() - hidden).saturating_sub(1);
        let y = inner.y + to_u16(row).min(inner.height.saturating_sub(1));
        frame.set_cursor_position((x, y));
    }
}

fn header_lines(assistant_name: &str) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            format!("Chat with {assistant_name}"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Powered by Gemini",
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

/// Lay out every message as styled lines wrapped to `width`
pub fn transcript_lines(
    snapshot: &ConversationSnapshot,
    assistant_name: &str,
    width: u16,
    frame: usize,
) -> StyledLines {
    let mut lines = Vec::new();
    for (i, message) in snapshot.messages.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.push(sender_line(message.role, assistant_name));
        lines.extend(message_body(message, width, frame));
    }
    lines
}

fn sender_line(role: Role, assistant_name: &str) -> Line<'static> {
    let (label, color) = match role {
        Role::User => ("You".to_string(), Color::Cyan),
        Role::Assistant => (assistant_name.to_string(), Color::Green),
    };
    Line::from(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

fn message_body(message: &Message, width: u16, frame: usize) -> StyledLines {
    match (message.role, message.status) {
        (_, MessageStatus::Pending) => vec![typing_indicator(frame)],
        (_, MessageStatus::Errored) => {
            plain_lines(&message.content, width, Style::default().fg(Color::Red))
        }
        (Role::User, MessageStatus::Resolved) => {
            plain_lines(&message.content, width, Style::default())
        }
        (Role::Assistant, MessageStatus::Resolved) => render_markdown(&message.content, width),
    }
}

fn plain_lines(text: &str, width: u16, style: Style) -> StyledLines {
    wrap(text, usize::from(width))
        .into_iter()
        .map(|row| Line::from(Span::styled(row, style)))
        .collect()
}

fn typing_indicator(frame: usize) -> Line<'static> {
    let dots = TYPING_FRAMES[frame % TYPING_FRAMES.len()];
    Line::from(Span::styled(
        dots,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    ))
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
