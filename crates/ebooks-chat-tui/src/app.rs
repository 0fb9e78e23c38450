use std::sync::Arc;

use ebooks_chat_core::{ChatMessage, ChatState, ChatTransport, StreamEvent};
use ratatui::layout::Rect;

use crate::ui;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub chat: ChatState,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view
    pub scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_area: Option<Rect>,

    // Clickable " Send " label on the input border
    pub send_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub endpoint: String,
    transport: Arc<dyn ChatTransport>,
}

impl App {
    pub fn new(greeting: &str, endpoint: String, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            should_quit: false,
            chat: ChatState::new(greeting),

            input: String::new(),
            cursor: 0,

            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            send_area: None,

            animation_frame: 0,

            endpoint,
            transport,
        }
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::clone(&self.transport)
    }

    pub fn is_pending(&self) -> bool {
        self.chat.is_pending()
    }

    /// Submit the input box. Returns the history to send when the turn
    /// was accepted.
    pub fn submit(&mut self) -> Option<Vec<ChatMessage>> {
        let submission = self.chat.submit(&self.input)?;
        self.chat = submission.state;
        self.input.clear();
        self.cursor = 0;
        self.animation_frame = 0;
        self.scroll_to_bottom();
        Some(submission.history)
    }

    pub fn apply_stream_event(&mut self, event: &StreamEvent) {
        self.chat = self.chat.apply(event);
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    fn wrap_width(&self) -> u16 {
        // Default to 50 until the first render reports the real size
        if self.chat_width > 0 {
            self.chat_width
        } else {
            50
        }
    }

    fn visible_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        }
    }

    fn max_scroll(&self) -> u16 {
        let total_lines =
            ui::conversation_lines(&self.chat, self.animation_frame, self.wrap_width()).len();
        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        total_lines.saturating_sub(self.visible_height())
    }

    /// Scroll chat so the last line is visible
    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.visible_height() / 2).max(1)
    }
}
