use std::io::{self, Stderr};
use std::panic;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEvent, KeyEventKind,
    MouseEvent,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ebooks_chat_core::StreamEvent;
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Drives the "Thinking..." animation
const TICK_RATE: Duration = Duration::from_millis(300);

/// Everything the run loop reacts to: terminal input, the animation clock and
/// the reply being streamed in the background.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    Tick,
    /// Progress of the reply currently streaming
    Stream(StreamEvent),
}

/// Keep key presses (not releases or repeats), mouse and resize
fn to_app_event(event: Event) -> Option<AppEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        _ => None,
    }
}

/// One channel for every event source. Terminal input and the tick run as
/// their own tasks; reply tasks get a sender through [`EventHandler::sender`].
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(read_terminal(tx.clone()));
        tokio::spawn(tick(tx.clone()));
        Self { rx, tx }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

async fn read_terminal(tx: mpsc::UnboundedSender<AppEvent>) {
    let mut reader = EventStream::new();
    while let Some(read) = reader.next().await {
        let event = match read {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "terminal event read failed");
                continue;
            }
        };
        let Some(event) = to_app_event(event) else {
            continue;
        };
        if tx.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("terminal event reader stopped");
}

async fn tick(tx: mpsc::UnboundedSender<AppEvent>) {
    let mut interval = tokio::time::interval(TICK_RATE);
    loop {
        interval.tick().await;
        if tx.send(AppEvent::Tick).is_err() {
            break;
        }
    }
}

/// Raw mode, alternate screen and mouse capture, drawing to stderr
pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stderr()))?)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Give the terminal back before the panic message prints
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = restore();
        original_hook(info);
    }));
}
