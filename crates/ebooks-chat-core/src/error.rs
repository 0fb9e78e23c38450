//! Request/stream failure

use reqwest::StatusCode;
use thiserror::Error;

/// The one failure kind the chat recognizes: the request could not be sent,
/// the endpoint answered with a non-success status, or the body stream broke.
///
/// The variants only exist for diagnostics. Callers treat them the same way
/// and never show them to the user.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat endpoint returned {0}")]
    Status(StatusCode),
    #[error("chat transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
