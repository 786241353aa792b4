//! Error types for AnkiConnect calls.

use crate::action::Action;

/// How a failed call should be treated by the retry policy and by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection refused/reset, DNS failure or timeout. Retried once.
    Transient,
    /// Anything the remote side will answer the same way again.
    Permanent,
    /// The store answered with an `error` string.
    RemoteReported,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::RemoteReported => "remote",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Connection to {url} failed: {cause}. Is Anki running with AnkiConnect enabled?")]
    ConnectionFailed { url: String, cause: String },

    #[error("{action} timed out after {elapsed_ms}ms")]
    Timeout { action: Action, elapsed_ms: u64 },

    #[error("{action} HTTP {status}: {body}")]
    HttpStatus {
        action: Action,
        status: u16,
        body: String,
    },

    #[error("{action} request failed: {cause}")]
    Request { action: Action, cause: String },

    #[error("{action} returned a malformed response: {cause}")]
    MalformedResponse { action: Action, cause: String },

    #[error("AnkiConnect error ({action}): {message}")]
    Remote { action: Action, message: String },

    #[error("{action} failed after {attempts} attempt(s): {last_error}")]
    RetryExhausted {
        action: Action,
        attempts: u32,
        last_error: Box<ConnectError>,
    },
}

impl ConnectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectError::ConnectionFailed { .. } | ConnectError::Timeout { .. } => {
                ErrorKind::Transient
            }
            ConnectError::HttpStatus { .. }
            | ConnectError::Request { .. }
            | ConnectError::MalformedResponse { .. } => ErrorKind::Permanent,
            ConnectError::Remote { .. } => ErrorKind::RemoteReported,
            ConnectError::RetryExhausted { last_error, .. } => last_error.kind(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectError::RetryExhausted { .. } => false,
            other => other.kind() == ErrorKind::Transient,
        }
    }

    /// The remote error string, if the store reported one.
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            ConnectError::Remote { message, .. } => Some(message),
            ConnectError::RetryExhausted { last_error, .. } => last_error.remote_message(),
            _ => None,
        }
    }
}
