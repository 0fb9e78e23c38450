use ebooks_chat_core::{ChatRole, ChatState};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        block::Title, Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
    },
    Frame,
};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;

const TITLE: &str = " e-Books Customer Assistance ";

// Brown for assistant turns, lighter brown for the user
const ASSISTANT_BUBBLE: Color = Color::Rgb(0x8B, 0x45, 0x13);
const USER_BUBBLE: Color = Color::Rgb(0xB2, 0x65, 0x00);

const TAB: &str = "    ";

/// Split into alternating runs of whitespace and non-whitespace
fn split_keeping_whitespace(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            tokens.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}

/// Push the current line, minus whitespace left dangling at the wrap point
fn flush_line(lines: &mut Vec<String>, current_line: &mut String, current_len: &mut usize) {
    let trimmed_len = current_line.trim_end().len();
    current_line.truncate(trimmed_len);
    if !current_line.is_empty() {
        lines.push(std::mem::take(current_line));
    }
    current_line.clear();
    *current_len = 0;
}

/// Wrap text to fit within a given number of terminal columns
///
/// Whitespace inside a line is kept as written (tabs become four spaces);
/// only the whitespace at a wrap point is dropped. Words wider than the
/// line are split by column.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);

    // Control characters would move the terminal cursor
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\t' {
            cleaned.push_str(TAB);
        } else if !c.is_control() {
            cleaned.push(c);
        }
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for token in split_keeping_whitespace(&cleaned) {
        let token_len = UnicodeWidthStr::width(token);

        if current_len + token_len <= width {
            current_line.push_str(token);
            current_len += token_len;
        } else if token.starts_with(char::is_whitespace) {
            flush_line(&mut lines, &mut current_line, &mut current_len);
        } else {
            if current_len > 0 {
                flush_line(&mut lines, &mut current_line, &mut current_len);
            }
            // Fits on a fresh line, or has to be broken by column
            for c in token.chars() {
                let char_len = UnicodeWidthChar::width(c).unwrap_or(0);
                if current_len + char_len > width && current_len > 0 {
                    flush_line(&mut lines, &mut current_line, &mut current_len);
                }
                current_line.push(c);
                current_len += char_len;
            }
        }
    }

    if !current_line.is_empty() || lines.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Every rendered line of the conversation, pre-wrapped to `width` so the
/// line count matches what ends up on screen.
pub fn conversation_lines(chat: &ChatState, animation_frame: u8, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(4));
    // Bubbles take three quarters of the view, minus one column of padding per side
    let bubble_width = (width * 3 / 4).max(12).min(width);
    let text_width = bubble_width.saturating_sub(2);

    let mut lines: Vec<Line<'static>> = Vec::new();
    let last_idx = chat.len().saturating_sub(1);

    for (idx, msg) in chat.messages().iter().enumerate() {
        let (label, color, alignment) = match msg.role {
            ChatRole::Assistant => ("e-Books", ASSISTANT_BUBBLE, Alignment::Left),
            ChatRole::User => ("You", USER_BUBBLE, Alignment::Right),
        };
        let bubble = Style::default().bg(color).fg(Color::White);

        lines.push(
            Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(alignment),
        );

        if msg.content.is_empty() {
            if chat.is_pending() && idx == last_idx {
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat(usize::from(animation_frame) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Thinking{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            } else {
                lines.push(Line::from(Span::styled("  ", bubble)).alignment(alignment));
            }
        } else {
            for paragraph in msg.content.split('\n') {
                for wrapped in wrap_text_to_width(paragraph, text_width) {
                    lines.push(
                        Line::from(Span::styled(format!(" {} ", wrapped), bubble))
                            .alignment(alignment),
                    );
                }
            }
        }

        lines.push(Line::default());
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(Color::White).bold()),
        Span::styled(format!("{} ", app.endpoint), Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(ASSISTANT_BUBBLE));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing
    app.chat_area = Some(area);

    // Inner size minus borders
    let height = area.height.saturating_sub(2);
    let width = area.width.saturating_sub(2);
    if height != app.chat_height || width != app.chat_width {
        app.chat_height = height;
        app.chat_width = width;
        app.scroll_to_bottom();
    }

    let lines = conversation_lines(&app.chat, app.animation_frame, width);
    let total_lines = lines.len();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ASSISTANT_BUBBLE))
        .title(" Conversation ");

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.scroll, 0));
    frame.render_widget(chat, area);

    if total_lines > usize::from(height) {
        let overflow = total_lines.saturating_sub(usize::from(height));
        let mut scrollbar_state = ScrollbarState::new(overflow).position(usize::from(app.scroll));
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let pending = app.is_pending();
    let border_color = if pending { Color::DarkGray } else { USER_BUBBLE };
    let send_label = if pending { " Sending... " } else { " Send " };

    // Right-aligned titles end one column before the corner
    let label_width = UnicodeWidthStr::width(send_label) as u16;
    let label_x = area.right().saturating_sub(label_width + 1).max(area.x);
    app.send_area = Some(Rect::new(label_x, area.y, label_width.min(area.width), 1));

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ")
        .title(
            Title::from(Span::styled(send_label, Style::default().fg(border_color).bold()))
                .alignment(Alignment::Right),
        );

    // Horizontal scrolling, measured in columns
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let chars: Vec<char> = app.input.chars().collect();
    let cursor_pos = app.cursor.min(chars.len());
    let char_width = |c: char| UnicodeWidthChar::width(c).unwrap_or(0);

    // Walk back from the cursor while it still fits on screen
    let mut scroll_offset = cursor_pos;
    let mut cursor_x = 0;
    while scroll_offset > 0 {
        let w = char_width(chars[scroll_offset - 1]);
        if cursor_x + w >= inner_width {
            break;
        }
        cursor_x += w;
        scroll_offset -= 1;
    }

    let mut visible_text = String::new();
    let mut visible_width = 0;
    for &c in &chars[scroll_offset..] {
        let w = char_width(c);
        if visible_width + w > inner_width {
            break;
        }
        visible_text.push(c);
        visible_width += w;
    }

    let text_color = if pending { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);

    frame.render_widget(input, area);

    // Input is disabled while a reply streams
    if !pending {
        frame.set_cursor_position((area.x + cursor_x as u16 + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = if app.is_pending() {
        Style::default().bg(Color::Yellow).fg(Color::Black)
    } else {
        Style::default().bg(Color::Blue).fg(Color::White)
    };
    let mode_text = if app.is_pending() { " SENDING " } else { " CHAT " };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" page ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ]);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
