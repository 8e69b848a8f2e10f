//! Convenience re-exports for common use.

pub use crate::config::LedgerConfig;
pub use crate::error::{
    categorize_transaction_error, classify, user_friendly_message, ClassifiedError,
    ErrorCategory, ErrorCode, LedgerError, RawFailure, TransactionErrorCategory,
};
pub use crate::observability::{NoopSink, ObservabilitySink, TracingSink};
pub use crate::pagination::{CursorPaginator, ListOptions, ListResponse, PageFetcher};
pub use crate::transaction::{
    IdempotencyKey, TransactionExecutor, TransactionOptions, TransactionOutcome,
    TransactionStatus,
};
pub use crate::util::retry::{RetryOptions, RetryPolicy};
