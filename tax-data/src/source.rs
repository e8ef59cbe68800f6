use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::wire::BracketsResponse;

/// Why a single fetch attempt failed.
///
/// The fetcher decides from [`AttemptError::is_retryable`] whether to try
/// again; sources only report what happened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl AttemptError {
    /// Timeouts, transport failures, server errors (5xx) and rate limiting
    /// (429) are transient. Other statuses and bad bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedBody(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// A place bracket tables can be read from, one attempt at a time.
///
/// Implementations perform exactly one request per call and never retry or
/// cache; timing, retry and validation belong to
/// [`BracketFetcher`](crate::BracketFetcher).
#[async_trait]
pub trait BracketSource: Send + Sync {
    /// Human-readable location of the brackets for `tax_year`, for logs.
    fn location(
        &self,
        tax_year: i32,
    ) -> String;

    async fn fetch_once(
        &self,
        tax_year: i32,
    ) -> Result<BracketsResponse, AttemptError>;
}
