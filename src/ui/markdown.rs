use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// A styled line ready for Ratatui rendering.
pub type StyledLines = Vec<Line<'static>>;

/// Convert an assistant reply into styled lines, wrapped to `wrap_width`.
///
/// Covers the subset replies actually use: emphasis, strikethrough, inline
/// and fenced code, nested lists, links, block quotes and GFM tables.
pub fn render_markdown(md: &str, wrap_width: u16) -> StyledLines {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let mut renderer = Renderer::new(wrap_width);
    for event in Parser::new_ext(md, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Table {
    rows: Vec<Vec<String>>,
    header_rows: usize,
    cell: String,
}

struct Renderer {
    width: usize,
    lines: StyledLines,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    /// One entry per open list: next ordinal, or `None` for bullets
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    table: Option<Table>,
    in_code_block: bool,
    /// Continuation indent for wrapped list items
    indent: usize,
}

impl Renderer {
    fn new(wrap_width: u16) -> Self {
        Self {
            width: if wrap_width == 0 { 80 } else { usize::from(wrap_width) },
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::default()],
            lists: Vec::new(),
            links: Vec::new(),
            table: None,
            in_code_block: false,
            indent: 0,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, f: impl FnOnce(Style) -> Style) {
        let style = f(self.style());
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(table) = &mut self.table {
                    table.cell.push_str(&text);
                } else if self.in_code_block {
                    let style = self.style();
                    let width = self.width.saturating_sub(2);
                    for line in text.lines() {
                        for row in hard_wrap(line, width) {
                            self.lines
                                .push(Line::from(Span::styled(format!("  {row}"), style)));
                        }
                    }
                } else {
                    self.push_text(&text);
                }
            }
            Event::Code(code) => {
                if let Some(table) = &mut self.table {
                    table.cell.push_str(&code);
                } else {
                    self.push_text_styled(&code, Style::default().fg(Color::Yellow));
                }
            }
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.break_line(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(self.width),
                    Style::default().fg(Color::DarkGray),
                )));
                self.blank();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.styles.push(heading_style(level));
            }
            Tag::Strong => self.push_style(|s| s.add_modifier(Modifier::BOLD)),
            Tag::Emphasis => self.push_style(|s| s.add_modifier(Modifier::ITALIC)),
            Tag::Strikethrough => self.push_style(|s| s.add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.push_style(|s| s.fg(Color::Blue).add_modifier(Modifier::UNDERLINED));
                self.links.push(dest_url.into_string());
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.in_code_block = true;
                self.styles.push(Style::default().fg(Color::Cyan));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let marker = format!("{}{marker}", "  ".repeat(depth));
                self.indent = marker.chars().count();
                self.spans.push(Span::raw(marker));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.push_style(|s| s.fg(Color::DarkGray));
                self.spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
            }
            Tag::Table(_) => {
                self.flush();
                self.table = Some(Table::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(table) = &mut self.table {
                    table.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.pop_style();
                self.flush();
                self.blank();
            }
            TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.links.pop() {
                    let shown = self.spans.last().is_some_and(|s| s.content == url);
                    if !url.is_empty() && !shown {
                        self.push_text_styled(
                            &format!(" ({url})"),
                            Style::default().fg(Color::DarkGray),
                        );
                    }
                }
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.pop_style();
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => {
                self.flush();
                self.indent = 0;
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.pop_style();
                self.blank();
            }
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    let cell = std::mem::take(&mut table.cell).trim().to_string();
                    if let Some(row) = table.rows.last_mut() {
                        row.push(cell);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header_rows = table.rows.len();
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_table(&table);
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        self.push_text_styled(text, style);
    }

    /// Append `text`, breaking at spaces once the line is full. Words longer
    /// than a whole line are split mid-word.
    fn push_text_styled(&mut self, text: &str, style: Style) {
        let mut col = current_col(&self.spans);
        let mut buf = String::new();
        for word in text.split_inclusive(' ') {
            let len = word.chars().count();
            if col + len > self.width && col > self.indent {
                col = self.wrap_row(&mut buf, style);
            }
            if col + len > self.width {
                for ch in word.chars() {
                    if col >= self.width && col > self.indent {
                        col = self.wrap_row(&mut buf, style);
                    }
                    buf.push(ch);
                    col += 1;
                }
            } else {
                buf.push_str(word);
                col += len;
            }
        }
        if !buf.is_empty() {
            self.spans.push(Span::styled(buf, style));
        }
    }

    /// Close the current row and start an indented one; returns the new column
    fn wrap_row(&mut self, buf: &mut String, style: Style) -> usize {
        if !buf.is_empty() {
            self.spans.push(Span::styled(std::mem::take(buf), style));
        }
        self.break_line();
        if self.indent > 0 {
            self.spans.push(Span::raw(" ".repeat(self.indent)));
        }
        self.indent
    }

    fn push_table(&mut self, table: &Table) {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &table.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let header = Style::default().add_modifier(Modifier::BOLD);
        let rule = Style::default().fg(Color::DarkGray);
        for (i, row) in table.rows.iter().enumerate() {
            let mut text = String::new();
            for (col, width) in widths.iter().enumerate() {
                if col > 0 {
                    text.push_str(" │ ");
                }
                let cell = row.get(col).map_or("", String::as_str);
                text.push_str(cell);
                text.push_str(&" ".repeat(width - cell.chars().count()));
            }
            let style = if i < table.header_rows {
                header
            } else {
                Style::default()
            };
            self.lines
                .push(Line::from(Span::styled(text.trim_end().to_string(), style)));

            if i + 1 == table.header_rows {
                let line = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.lines.push(Line::from(Span::styled(line, rule)));
            }
        }
        self.blank();
    }

    fn break_line(&mut self) {
        self.lines.push(Line::from(std::mem::take(&mut self.spans)));
    }

    fn flush(&mut self) {
        if !self.spans.is_empty() {
            self.break_line();
        }
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> StyledLines {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    match level {
        HeadingLevel::H1 => Style::default()
            .fg(Color::LightBlue)
            .add_modifier(Modifier::BOLD),
        HeadingLevel::H2 => Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        HeadingLevel::H3 => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        _ => Style::default().add_modifier(Modifier::BOLD),
    }
}

/// Split `line` into rows of at most `width` chars; an empty line stays one row
fn hard_wrap(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn current_col(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}
