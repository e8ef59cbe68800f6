//! The error taxonomy shared by bracket acquisition and tax calculation.
//!
//! Every failure a caller can see is one [`TaxApiError`] variant. Each variant
//! maps to a stable [`ErrorKind`] code, so a presentation layer can choose a
//! remediation message by matching on the kind rather than on message text.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::calculations::MarginalTaxError;
use crate::models::{BracketTableError, SupportedTaxYears};

/// Stable, machine-readable classification of a [`TaxApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidTaxYear,
    InvalidIncome,
    NetworkError,
    InvalidResponse,
    ServerError,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidTaxYear => "INVALID_TAX_YEAR",
            Self::InvalidIncome => "INVALID_INCOME",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::ServerError => "SERVER_ERROR",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the failure came from caller input rather than from the
    /// bracket source or the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidTaxYear | Self::InvalidIncome)
    }
}

/// Errors surfaced by bracket fetching and tax calculation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxApiError {
    /// The requested year is outside the configured supported set.
    /// Detected before any network call.
    #[error("Tax year {year} is not supported. Supported years: {supported}")]
    InvalidTaxYear {
        year: i32,
        supported: SupportedTaxYears,
    },

    /// Income was negative. Detected before any network call.
    #[error("Annual income cannot be negative (got {income})")]
    InvalidIncome { income: Decimal },

    /// Transient failures persisted through the whole retry budget.
    /// Carries the last underlying cause.
    #[error("network error after {attempts} attempt(s): {message}")]
    Network {
        message: String,
        status: Option<u16>,
        code: Option<String>,
        attempts: u32,
    },

    /// The bracket source answered with data that is malformed or breaks
    /// the bracket table invariants. Never retried.
    #[error("invalid bracket response: {reason}")]
    InvalidResponse { reason: String },

    /// The bracket source rejected the request with a non-retryable status.
    #[error("{message}")]
    Server {
        message: String,
        status: u16,
        code: Option<String>,
    },

    /// The caller cancelled the request or its overall deadline expired.
    #[error("request cancelled: {reason}")]
    Cancelled { reason: String },
}

impl TaxApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTaxYear { .. } => ErrorKind::InvalidTaxYear,
            Self::InvalidIncome { .. } => ErrorKind::InvalidIncome,
            Self::Network { .. } => ErrorKind::NetworkError,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Stable code for this error, independent of the message text.
    pub fn code(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Code supplied by the bracket source in its error payload, if any.
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Self::Network { code, .. } | Self::Server { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// HTTP status associated with the failure, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the same request might succeed if issued again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            code: self.code(),
            message: self.to_string(),
            status: self.status(),
            remote_code: self.remote_code().map(str::to_string),
            retryable: self.is_retryable(),
        }
    }
}

impl From<BracketTableError> for TaxApiError {
    fn from(err: BracketTableError) -> Self {
        TaxApiError::InvalidResponse {
            reason: err.to_string(),
        }
    }
}

impl From<MarginalTaxError> for TaxApiError {
    fn from(err: MarginalTaxError) -> Self {
        match err {
            MarginalTaxError::InvalidIncome(income) => TaxApiError::InvalidIncome { income },
            other @ MarginalTaxError::IncomeExceedsTable { .. } => TaxApiError::InvalidResponse {
                reason: other.to_string(),
            },
        }
    }
}

/// Flat, serializable view of a [`TaxApiError`] for callers that emit JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_code: Option<String>,
    pub retryable: bool,
}
