//! Error taxonomy for case lookups.

use std::time::Duration;

/// Failure of a single logical fetch, after the retry state machine settled.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure. `connect` is set when the connection itself
    /// could not be established (refused, unreachable, DNS).
    #[error("transport error: {message}")]
    Transport { message: String, connect: bool },

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("retries exhausted after {attempts} attempts, last error: {last}")]
    RetriesExhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Stable classification string: `timeout`, `transport`,
    /// `http-status:<code>` or `retries-exhausted`.
    pub fn classification(&self) -> String {
        match self {
            FetchError::Timeout(_) => "timeout".to_string(),
            FetchError::Transport { .. } => "transport".to_string(),
            FetchError::HttpStatus(code) => format!("http-status:{code}"),
            FetchError::RetriesExhausted { .. } => "retries-exhausted".to_string(),
        }
    }

    /// Whether the fetch failed because the host could not be reached in
    /// time: timeouts and connect-phase transport errors.
    pub fn is_connectivity(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Transport { connect, .. } => *connect,
            FetchError::HttpStatus(_) => false,
            FetchError::RetriesExhausted { last, .. } => last.is_connectivity(),
        }
    }

    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Transport {
                message: err.to_string(),
                connect: err.is_connect(),
            }
        }
    }
}

/// All errors surfaced by the lookup core.
#[derive(thiserror::Error, Debug, Clone)]
pub enum LookupError {
    #[error("invalid case identifier: expected {expected} digits, found {found}")]
    InvalidIdentifier { expected: &'static str, found: usize },

    #[error("unknown court: {0}")]
    UnknownCourt(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed response from {source_name}: {message}")]
    Decode {
        source_name: &'static str,
        message: String,
    },

    #[error("invalid extraction rules for {portal}: {message}")]
    Rules {
        portal: &'static str,
        message: String,
    },

    #[error("invalid URL {url}: {message}")]
    Url { url: String, message: String },
}

impl LookupError {
    /// Stable classification used in the per-source error map.
    pub fn classification(&self) -> String {
        match self {
            LookupError::InvalidIdentifier { .. } => "invalid-identifier".to_string(),
            LookupError::UnknownCourt(_) => "unknown-court".to_string(),
            LookupError::Fetch(e) => e.classification(),
            LookupError::Decode { .. } => "decode".to_string(),
            LookupError::Rules { .. } => "rules".to_string(),
            LookupError::Url { .. } => "url".to_string(),
        }
    }
}
