use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ebooks_chat_core::{reply_events, ChatMessage};
use futures_util::StreamExt;
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent, events: &mpsc::UnboundedSender<AppEvent>) {
    match event {
        AppEvent::Key(key) => handle_key(app, key, events),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse, events),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Stream(event) => app.apply_stream_event(&event),
    }
}

fn handle_key(app: &mut App, key: KeyEvent, events: &mpsc::UnboundedSender<AppEvent>) {
    // Global keys
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Chat scrolling works while a reply streams
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.half_page()),
        KeyCode::PageDown => app.scroll_down(app.half_page()),

        // Input is disabled until the reply is done
        _ if app.is_pending() => {}

        KeyCode::Enter if !key.modifiers.contains(KeyModifiers::SHIFT) => send(app, events),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Submit the input box and start streaming the reply. Enter and a click on
/// the Send label both land here.
fn send(app: &mut App, events: &mpsc::UnboundedSender<AppEvent>) {
    if let Some(history) = app.submit() {
        tracing::debug!(turns = history.len(), "submitting conversation");
        spawn_reply(app, history, events);
    }
}

/// Drive one reply in the background, forwarding its events to the app loop
fn spawn_reply(app: &App, history: Vec<ChatMessage>, events: &mpsc::UnboundedSender<AppEvent>) {
    let transport = app.transport();
    let tx = events.clone();

    tokio::spawn(async move {
        let replies = reply_events(transport, history);
        futures_util::pin_mut!(replies);
        while let Some(event) = replies.next().await {
            // App is gone, stop reading
            if tx.send(AppEvent::Stream(event)).is_err() {
                break;
            }
        }
    });
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, events: &mpsc::UnboundedSender<AppEvent>) {
    let (x, y) = (mouse.column, mouse.row);
    let hit = |area: Option<Rect>| area.map_or(false, |r| point_in_rect(x, y, r));

    match mouse.kind {
        // submit() already refuses while a reply streams
        MouseEventKind::Down(MouseButton::Left) if hit(app.send_area) => send(app, events),
        MouseEventKind::ScrollDown if hit(app.chat_area) => app.scroll_down(3),
        MouseEventKind::ScrollUp if hit(app.chat_area) => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use ebooks_chat_core::StreamEvent;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn click(column: u16, row: u16) -> AppEvent {
        mouse(MouseEventKind::Down(MouseButton::Left), column, row)
    }

    /// Input box along the bottom of a 60x20 terminal, as render lays it out
    fn with_layout(app: &mut App) {
        app.chat_area = Some(Rect::new(0, 1, 60, 15));
        app.send_area = Some(Rect::new(53, 16, 6, 1));
    }

    fn type_text(app: &mut App, text: &str, tx: &mpsc::UnboundedSender<AppEvent>) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)), tx);
        }
    }

    /// Feed stream events back into the app until the reply settles
    async fn drain_reply(
        app: &mut App,
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
        tx: &mpsc::UnboundedSender<AppEvent>,
    ) {
        while app.is_pending() {
            let event = rx.recv().await.expect("stream event");
            handle_event(app, event, tx);
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        assert_eq!(char_to_byte_index("añb", 2), 3);
        assert_eq!(char_to_byte_index("añb", 10), 4);
    }

    #[test]
    fn test_editing_keys() {
        let mut app = test_app(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();

        type_text(&mut app, "naïve", &tx);
        handle_event(&mut app, key(KeyCode::Left), &tx);
        handle_event(&mut app, key(KeyCode::Backspace), &tx);
        assert_eq!(app.input, "naïe");

        handle_event(&mut app, key(KeyCode::Home), &tx);
        handle_event(&mut app, key(KeyCode::Delete), &tx);
        assert_eq!(app.input, "aïe");

        handle_event(&mut app, key(KeyCode::End), &tx);
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_escape_and_ctrl_c_quit() {
        let mut app = test_app(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();
        handle_event(&mut app, key(KeyCode::Esc), &tx);
        assert!(app.should_quit);

        let mut app = test_app(vec![]);
        let ctrl_c = KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        handle_event(&mut app, AppEvent::Key(ctrl_c), &tx);
        assert!(app.should_quit);
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_shift_enter_does_not_submit() {
        let mut app = test_app(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();
        type_text(&mut app, "Hello", &tx);

        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)),
            &tx,
        );
        assert_eq!(app.chat.len(), 1);
        assert_eq!(app.input, "Hello");
    }

    #[tokio::test]
    async fn test_enter_streams_reply_into_chat() {
        let mut app = test_app(vec!["Hel", "lo!"]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        type_text(&mut app, "Hello", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx);
        assert!(app.is_pending());
        assert!(app.input.is_empty());

        drain_reply(&mut app, &mut rx, &tx).await;

        assert_eq!(app.chat.len(), 3);
        assert_eq!(app.chat.messages()[1].content, "Hello");
        assert_eq!(app.chat.last().unwrap().content, "Hello!");
    }

    #[tokio::test]
    async fn test_typing_ignored_while_pending() {
        let mut app = test_app(vec!["ok"]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        type_text(&mut app, "Hi", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx);
        type_text(&mut app, "more", &tx);
        handle_event(&mut app, key(KeyCode::Enter), &tx);
        assert!(app.input.is_empty());

        drain_reply(&mut app, &mut rx, &tx).await;
        assert_eq!(app.chat.len(), 3);

        type_text(&mut app, "next", &tx);
        assert_eq!(app.input, "next");
    }

    #[test]
    fn test_stray_stream_event_ignored_when_idle() {
        let mut app = test_app(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();
        handle_event(&mut app, AppEvent::Stream(StreamEvent::Chunk("late".into())), &tx);
        assert_eq!(app.chat.len(), 1);
        assert!(!app.chat.last().unwrap().content.ends_with("late"));
    }

    #[tokio::test]
    async fn test_clicking_send_streams_reply() {
        let mut app = test_app(vec!["Sure, ", "here you go."]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        with_layout(&mut app);

        type_text(&mut app, "Can I get a refund?", &tx);
        handle_event(&mut app, click(55, 16), &tx);
        assert!(app.is_pending());
        assert!(app.input.is_empty());

        drain_reply(&mut app, &mut rx, &tx).await;

        assert_eq!(app.chat.len(), 3);
        assert_eq!(app.chat.messages()[1].content, "Can I get a refund?");
        assert_eq!(app.chat.last().unwrap().content, "Sure, here you go.");
    }

    #[tokio::test]
    async fn test_click_send_ignored_when_blank_or_pending() {
        let mut app = test_app(vec!["ok"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        with_layout(&mut app);

        type_text(&mut app, "   ", &tx);
        handle_event(&mut app, click(55, 16), &tx);
        assert_eq!(app.chat.len(), 1);
        assert!(!app.is_pending());

        app.input.clear();
        app.cursor = 0;
        type_text(&mut app, "Hi", &tx);
        handle_event(&mut app, click(55, 16), &tx);
        assert_eq!(app.chat.len(), 3);

        // Second click while the first reply streams
        app.input = "again".into();
        handle_event(&mut app, click(55, 16), &tx);
        assert_eq!(app.chat.len(), 3);

        assert_eq!(app.input, "again");

        drain_reply(&mut app, &mut rx, &tx).await;
        assert_eq!(app.chat.len(), 3);
        assert_eq!(app.chat.last().unwrap().content, "ok");
    }

    #[test]
    fn test_click_outside_send_does_nothing() {
        let mut app = test_app(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();
        with_layout(&mut app);

        type_text(&mut app, "Hello", &tx);
        handle_event(&mut app, click(10, 16), &tx);
        handle_event(&mut app, click(55, 17), &tx);
        handle_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Right), 55, 16), &tx);
        assert_eq!(app.chat.len(), 1);
        assert_eq!(app.input, "Hello");
    }

    #[test]
    fn test_wheel_scrolls_only_inside_chat() {
        let mut app = test_app(vec![]);
        let (tx, _rx) = mpsc::unbounded_channel();
        with_layout(&mut app);
        app.chat_height = 2;
        app.scroll = 1;

        handle_event(&mut app, mouse(MouseEventKind::ScrollUp, 30, 18), &tx);
        assert_eq!(app.scroll, 1);
        handle_event(&mut app, mouse(MouseEventKind::ScrollUp, 30, 5), &tx);
        assert_eq!(app.scroll, 0);
    }
}
