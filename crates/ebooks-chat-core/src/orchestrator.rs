//! Turns one submitted conversation into a sequence of stream events
//!
//! `reply_events` is the only place that talks to the transport. Whatever
//! goes wrong in there ends as a single `StreamEvent::Failed`; the cause is
//! logged and never leaves this module.

use std::sync::Arc;

use futures_util::stream::{Stream, StreamExt};

use crate::client::ChatTransport;
use crate::decode::Utf8StreamDecoder;
use crate::state::ChatMessage;

/// What the reply stream reports back to the state owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Decoded text to append to the placeholder
    Chunk(String),
    /// Body ended cleanly
    Finished,
    /// Request or stream failed
    Failed,
}

/// Send `history` and yield the decoded reply in arrival order.
///
/// The last item is always `Finished` or `Failed`.
pub fn reply_events<T>(
    transport: Arc<T>,
    history: Vec<ChatMessage>,
) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    T: ChatTransport + ?Sized + 'static,
{
    async_stream::stream! {
        let mut chunks = match transport.send(&history).await {
            Ok(chunks) => chunks,
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                yield StreamEvent::Failed;
                return;
            }
        };

        let mut decoder = Utf8StreamDecoder::new();
        let mut received = 0usize;

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    received += bytes.len();
                    let text = decoder.decode(&bytes);
                    if !text.is_empty() {
                        yield StreamEvent::Chunk(text);
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, received, "chat stream failed");
                    yield StreamEvent::Failed;
                    return;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            tracing::warn!("chat stream ended inside a multi-byte character");
            yield StreamEvent::Chunk(tail);
        }

        tracing::info!(bytes = received, "chat reply complete");
        yield StreamEvent::Finished;
    }
}
