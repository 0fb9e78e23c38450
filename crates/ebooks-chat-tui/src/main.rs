use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use ebooks_chat_core::{Config, HttpTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "ebooks-chat")]
#[command(version, about = "Chat with the e-Books customer assistant from your terminal")]
struct Cli {
    /// Base URL of the chat backend (requests go to <URL>/api/chat)
    #[arg(long, env = "EBOOKS_CHAT_ENDPOINT")]
    endpoint: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

fn log_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?;
    Ok(cache_dir.join("ebooks-chat").join("ebooks-chat.log"))
}

/// The terminal belongs to the UI, so logs go to a file
fn init_logging(debug: bool) -> Result<PathBuf> {
    let path = log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = File::create(&path)?;

    let default_filter = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(log_file)),
        )
        .init();

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let log_file = init_logging(cli.debug)?;

    let endpoint = cli
        .endpoint
        .clone()
        .unwrap_or_else(|| config.endpoint_or_default());
    let transport = HttpTransport::new(&endpoint);
    tracing::info!(endpoint = transport.endpoint(), log = ?log_file, "starting chat");

    let mut app = App::new(config.greeting(), endpoint, Arc::new(transport));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    let sender = events.sender();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event, &sender),
            None => break,
        }
    }

    tracing::info!(turns = app.chat.len(), "chat closed");
    Ok(())
}
