//! Errors surfaced by the data access layer.
//!
//! Every variant is a failure of the round trip to the signals endpoint. A
//! failed batch rejects all consumers that were waiting on it, so the error
//! has to be cheap to clone.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("signals query request failed: {0}")]
    Transport(String),

    #[error("signals query returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode signals query response: {0}")]
    Decode(String),

    #[error("signals query returned {actual} results for {expected} queries")]
    ResponseLength { expected: usize, actual: usize },

    #[error("signals query result {index} does not match the requested query mode")]
    ModeMismatch { index: usize },

    #[error("fetch batch was dropped before it completed")]
    BatchAbandoned,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
