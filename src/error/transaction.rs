//! Business-level buckets for failed transaction submissions.

use strum::{Display, EnumString};

use super::classify::ClassifiedError;
use super::unified::{ErrorCategory, ErrorCode};

/// Why a transaction submission failed, in ledger terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionErrorCategory {
    InsufficientFunds,
    AccountFrozen,
    AccountInactive,
    DuplicateTransaction,
    LimitExceeded,
    AssetMismatch,
    InvalidTransaction,
    AccountNotFound,
    UnauthorizedTransaction,
    TransactionRejected,
    TransactionFailed,
}

/// Message keywords, checked in order. Matching is case-sensitive.
const KEYWORDS: &[(&str, TransactionErrorCategory)] = &[
    ("insufficient", TransactionErrorCategory::InsufficientFunds),
    ("frozen", TransactionErrorCategory::AccountFrozen),
    ("inactive", TransactionErrorCategory::AccountInactive),
    ("duplicate", TransactionErrorCategory::DuplicateTransaction),
    ("idempotency", TransactionErrorCategory::DuplicateTransaction),
    ("mismatch", TransactionErrorCategory::AssetMismatch),
    ("limit", TransactionErrorCategory::LimitExceeded),
];

/// Bucket a classified transaction failure.
///
/// Precedence: an explicit business code, then message keywords, then the
/// category alone. Keywords outrank the category because `Unprocessable`
/// covers several distinct business failures.
///
/// Only a duplicate or idempotency code or keyword yields
/// [`TransactionErrorCategory::DuplicateTransaction`]. Any other conflict,
/// such as a stale balance version, is a rejection: nothing was committed.
pub fn categorize_transaction_error(classified: &ClassifiedError) -> TransactionErrorCategory {
    if let Some(bucket) = from_code(classified.code()) {
        return bucket;
    }

    let original = classified.cause().original_message();
    for (keyword, bucket) in KEYWORDS {
        if classified.message().contains(keyword) || original.contains(keyword) {
            return *bucket;
        }
    }

    match classified.category() {
        ErrorCategory::Validation => TransactionErrorCategory::InvalidTransaction,
        ErrorCategory::NotFound => TransactionErrorCategory::AccountNotFound,
        ErrorCategory::Authentication | ErrorCategory::Authorization => {
            TransactionErrorCategory::UnauthorizedTransaction
        }
        ErrorCategory::LimitExceeded => TransactionErrorCategory::LimitExceeded,
        ErrorCategory::Conflict | ErrorCategory::Unprocessable => {
            TransactionErrorCategory::TransactionRejected
        }
        _ => TransactionErrorCategory::TransactionFailed,
    }
}

fn from_code(code: &ErrorCode) -> Option<TransactionErrorCategory> {
    let bucket = match code {
        ErrorCode::InsufficientBalance => TransactionErrorCategory::InsufficientFunds,
        ErrorCode::AccountFrozen => TransactionErrorCategory::AccountFrozen,
        ErrorCode::AccountInactive => TransactionErrorCategory::AccountInactive,
        ErrorCode::DuplicateTransaction | ErrorCode::IdempotencyConflict => {
            TransactionErrorCategory::DuplicateTransaction
        }
        ErrorCode::AssetMismatch => TransactionErrorCategory::AssetMismatch,
        ErrorCode::InvalidTransaction => TransactionErrorCategory::InvalidTransaction,
        _ => return None,
    };
    Some(bucket)
}
