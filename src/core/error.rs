use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of diagnostic messages surfaced inside placeholder records.
pub const MAX_DIAGNOSTIC_LEN: usize = 80;

/// Failure taxonomy shared by everything that talks to the RPC service.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    RateLimited,
    NotFound,
    Transient,
    Malformed,
}

impl ErrorKind {
    /// Best-effort classification of a free-form error message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
            Self::RateLimited
        } else if lower.contains("not found") || lower.contains("could not find") {
            Self::NotFound
        } else {
            Self::Transient
        }
    }

    pub fn is_rate_limited(self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

/// Uniform error object handed to collaborators for any failed request.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[error("{kind:?}: {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    /// Maps a non-success HTTP status to the taxonomy.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => ErrorKind::RateLimited,
            404 => ErrorKind::NotFound,
            _ => match ErrorKind::from_message(body) {
                ErrorKind::RateLimited => ErrorKind::RateLimited,
                _ => ErrorKind::Transient,
            },
        };
        Self::new(kind, format!("HTTP {status}: {}", truncate(body, MAX_DIAGNOSTIC_LEN)))
    }

    /// Maps a JSON-RPC `error` object to the taxonomy.
    pub fn from_rpc_error(code: i64, message: &str) -> Self {
        let kind = match code {
            429 | -32429 => ErrorKind::RateLimited,
            -32602 => match ErrorKind::from_message(message) {
                ErrorKind::RateLimited => ErrorKind::RateLimited,
                _ => ErrorKind::NotFound,
            },
            _ => ErrorKind::from_message(message),
        };
        Self::new(kind, format!("RPC error {code}: {message}"))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind.is_rate_limited()
    }

    /// Message cut down to the diagnostic length used for display.
    pub fn truncated(&self) -> String {
        truncate(&self.message, MAX_DIAGNOSTIC_LEN)
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), &err.to_string());
        }
        if err.is_decode() {
            return Self::malformed(err.to_string());
        }
        // timeouts, connection resets, request building
        Self::transient(err.to_string())
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

/// Errors surfaced by the aggregation pipeline as a whole.
#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("subject {subject} was superseded, results discarded")]
    Superseded { subject: String },
    #[error("page {index} is not reachable from the known cursors")]
    PageUnavailable { index: usize },
    #[error("a page fetch is already in flight")]
    Busy,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl AggregatorError {
    pub fn superseded(subject: impl Into<String>) -> Self {
        Self::Superseded {
            subject: subject.into(),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Rpc(err) => Some(err.kind),
            _ => None,
        }
    }
}

pub(crate) fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}
