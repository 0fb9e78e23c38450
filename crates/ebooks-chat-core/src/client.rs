use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use crate::error::ChatError;
use crate::state::ChatMessage;

/// Raw response body chunks, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, ChatError>>;

/// Sends the conversation to the chat backend and hands back the reply body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, history: &[ChatMessage]) -> Result<ChunkStream, ChatError>;
}

/// `POST {base_url}/api/chat` over HTTP.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, history: &[ChatMessage]) -> Result<ChunkStream, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .json(history)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Status(response.status()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ChatError::from))
            .boxed())
    }
}
