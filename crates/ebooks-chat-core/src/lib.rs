pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod orchestrator;
pub mod state;

// Re-export main types for convenience
pub use client::{ChatTransport, ChunkStream, HttpTransport};
pub use config::Config;
pub use decode::Utf8StreamDecoder;
pub use error::ChatError;
pub use orchestrator::{reply_events, StreamEvent};
pub use state::{ChatMessage, ChatRole, ChatState, Phase, Submission, FAILURE_MESSAGE};
