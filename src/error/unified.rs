//! Unified error taxonomy and recovery hints.

use std::fmt;
use std::str::FromStr;

use strum::EnumString;

/// Broad error category, independent of the remote service's vocabulary.
///
/// The closed set covers every failure the ledger service reports. `Other`
/// carries categories taken verbatim from foreign errors (an error type name
/// such as `"Error"`, or a `code` string attached to a plain object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Authentication,
    Authorization,
    Conflict,
    LimitExceeded,
    Timeout,
    Network,
    Unprocessable,
    Internal,
    Unknown,
    #[strum(default)]
    Other(String),
}

impl ErrorCategory {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Conflict => "conflict",
            Self::LimitExceeded => "limit_exceeded",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Unprocessable => "unprocessable",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }

    /// Parse a snake_case name. Unrecognized names are kept as `Other`.
    pub fn parse(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or_else(|_| Self::Other(raw.to_string()))
    }

    /// Map an HTTP status code onto a category.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::Validation,
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            409 => Self::Conflict,
            422 => Self::Unprocessable,
            429 => Self::LimitExceeded,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable error code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    MissingParameter,
    NotFound,
    Unauthorized,
    Forbidden,
    AlreadyExists,
    Conflict,
    IdempotencyConflict,
    DuplicateTransaction,
    RateLimitExceeded,
    InsufficientBalance,
    AccountFrozen,
    AccountInactive,
    AssetMismatch,
    InvalidTransaction,
    TransactionRejected,
    Timeout,
    ConnectionFailed,
    ServiceUnavailable,
    InternalError,
    Cancelled,
    Unknown,
    #[strum(default)]
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::MissingParameter => "missing_parameter",
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::AlreadyExists => "already_exists",
            Self::Conflict => "conflict",
            Self::IdempotencyConflict => "idempotency_conflict",
            Self::DuplicateTransaction => "duplicate_transaction",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InsufficientBalance => "insufficient_balance",
            Self::AccountFrozen => "account_frozen",
            Self::AccountInactive => "account_inactive",
            Self::AssetMismatch => "asset_mismatch",
            Self::InvalidTransaction => "invalid_transaction",
            Self::TransactionRejected => "transaction_rejected",
            Self::Timeout => "timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InternalError => "internal_error",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }

    /// Parse a snake_case code. Unrecognized codes are kept as `Other`.
    pub fn parse(raw: &str) -> Self {
        Self::from_str(raw).unwrap_or_else(|_| Self::Other(raw.to_string()))
    }

    /// Default code for an HTTP status when the body carries none.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidInput,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            409 => Self::Conflict,
            422 => Self::TransactionRejected,
            429 => Self::RateLimitExceeded,
            502 | 503 => Self::ServiceUnavailable,
            500..=599 => Self::InternalError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    CheckCredentials,
    CheckPermissions,
    FixRequest,
    VerifyResource,
    UseExistingResource,
    ContactSupport,
}

impl RecoverySuggestion {
    pub fn for_category(category: &ErrorCategory) -> Self {
        match category {
            ErrorCategory::Validation | ErrorCategory::Unprocessable => Self::FixRequest,
            ErrorCategory::NotFound => Self::VerifyResource,
            ErrorCategory::Authentication => Self::CheckCredentials,
            ErrorCategory::Authorization => Self::CheckPermissions,
            ErrorCategory::Conflict => Self::UseExistingResource,
            ErrorCategory::LimitExceeded | ErrorCategory::Timeout | ErrorCategory::Network => {
                Self::RetryWithBackoff
            }
            ErrorCategory::Internal | ErrorCategory::Unknown | ErrorCategory::Other(_) => {
                Self::ContactSupport
            }
        }
    }
}
