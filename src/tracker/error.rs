use crate::bencode::BencodeError;
use thiserror::Error;

/// Errors that can occur while talking to a tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The announce URL is not an HTTP(S) URL.
    #[error("invalid tracker url: {0}")]
    InvalidUrl(String),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The tracker answered with a non-200 status.
    #[error("tracker returned status {0}")]
    ServerError(u16),

    /// The tracker reported a failure reason in its reply.
    #[error("tracker failure: {0}")]
    Failure(String),

    /// The tracker reply was not in the expected shape.
    #[error("malformed tracker response: {0}")]
    InvalidResponse(String),

    /// The reply body was not valid bencode.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),
}
