//! Error types for the spinbot service.
//!
//! API failures are kept apart from the rest so that the poller can tell a
//! recoverable API error (logged, cycle continues) from a local failure such
//! as an unreadable checkpoint file (fatal).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// Errors returned by the Twitter/X API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("transport error during '{operation}': {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("Twitter API error for operation '{operation}' ({status}): {message}")]
    Status {
        operation: String,
        status: u16,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("unexpected response for operation '{operation}': {reason}")]
    Decode { operation: String, reason: String },

    /// The request could not be signed or built.
    #[error("cannot build request: {0}")]
    Request(String),
}

impl ApiError {
    /// HTTP status of the failure, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised while running the bot.
#[derive(Error, Debug)]
pub enum BotError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint file {} does not hold a mention id: {content:?}", .path.display())]
    Checkpoint { path: PathBuf, content: String },

    #[error("the {0} pool is empty")]
    EmptyPool(&'static str),

    #[error("missing or empty credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("status server error: {0}")]
    Server(#[source] std::io::Error),
}

impl BotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BotError::Io {
            path: path.into(),
            source,
        }
    }
}
