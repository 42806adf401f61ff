//! Error types for configuration and transport.

use thiserror::Error;

/// Errors that can occur while building a [`crate::Config`].
///
/// These abort construction; once a `Client` exists, no operation on it
/// returns one of these (see [`crate::Outcome`] for the per-event error
/// channel used after construction).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("write key is required")]
    WriteKeyRequired,

    #[error("classic write keys (32 characters) require a non-empty dataset")]
    ClassicKeyRequiresDataset,

    #[error("failed to build HTTP client: {0}")]
    HttpClientBuild(#[from] reqwest::Error),
}

/// Transport-level failure folded into an [`crate::Outcome`].
///
/// Never escapes the crate as an `Err` from a public async method; it is
/// always turned into an `Outcome::Transport` before the send worker ends.
#[derive(Debug, Clone, Error)]
pub(crate) enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("server returned malformed batch response: {0}")]
    MalformedResponse(String),

    #[error("server error: {status}")]
    Status { status: u16 },
}

impl TransportError {
    pub(crate) fn status_code(&self) -> Option<u16> {
        match self {
            TransportError::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
