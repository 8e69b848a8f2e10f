//! Idempotency-aware transaction submission.
//!
//! [`TransactionExecutor`] wraps a [`RetryPolicy`] and never returns an error:
//! every submission ends in one of three [`TransactionOutcome`]s. A failure
//! that categorizes as [`TransactionErrorCategory::DuplicateTransaction`] is
//! reported as [`TransactionOutcome::Duplicate`], not as a failure. This is
//! the only place in the crate where an error is turned into a non-error
//! outcome: an idempotency-key collision means an earlier attempt already
//! committed the transaction exactly once.

mod idempotency;

pub use idempotency::{IdempotencyKey, IDEMPOTENCY_HEADER};

use std::future::Future;
use std::sync::Arc;

use strum::{Display, EnumString};

use crate::error::{
    categorize_transaction_error, classify, ClassifiedError, RawFailure, TransactionErrorCategory,
};
use crate::observability::{ObservabilitySink, SpanGuard};
use crate::util::retry::RetryPolicy;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Overrides the executor policy's retry budget for this call.
    pub max_retries: Option<u32>,
}

impl TransactionOptions {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }
}

/// Status tag of a [`TransactionOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionStatus {
    Success,
    Duplicate,
    Failed,
}

/// Result of one transaction submission.
#[derive(Debug, Clone)]
pub enum TransactionOutcome<T> {
    /// The service accepted the transaction.
    Success { transaction: T },
    /// The service rejected the submission as a repeat of one it already
    /// committed. The funds moved exactly once. `existing_id` is only set when
    /// the service names the conflicting transaction.
    Duplicate {
        existing_id: Option<String>,
        error: ClassifiedError,
    },
    /// Any other failure, after retries were exhausted or ruled out.
    Failed {
        category: TransactionErrorCategory,
        error: ClassifiedError,
    },
}

impl<T> TransactionOutcome<T> {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Self::Success { .. } => TransactionStatus::Success,
            Self::Duplicate { .. } => TransactionStatus::Duplicate,
            Self::Failed { .. } => TransactionStatus::Failed,
        }
    }

    /// True for success and duplicate: the effect has been applied once.
    pub fn is_committed(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn transaction(&self) -> Option<&T> {
        match self {
            Self::Success { transaction } => Some(transaction),
            _ => None,
        }
    }

    pub fn into_transaction(self) -> Option<T> {
        match self {
            Self::Success { transaction } => Some(transaction),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Success { .. } => None,
            Self::Duplicate { error, .. } | Self::Failed { error, .. } => Some(error),
        }
    }
}

/// Outcomes of a batch, in submission order, with per-status counts.
#[derive(Debug, Clone)]
pub struct BatchSummary<T> {
    pub outcomes: Vec<TransactionOutcome<T>>,
    pub succeeded: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl<T> Default for BatchSummary<T> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
            succeeded: 0,
            duplicates: 0,
            failed: 0,
        }
    }
}

impl<T> BatchSummary<T> {
    fn push(&mut self, outcome: TransactionOutcome<T>) {
        match outcome.status() {
            TransactionStatus::Success => self.succeeded += 1,
            TransactionStatus::Duplicate => self.duplicates += 1,
            TransactionStatus::Failed => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Success and duplicate outcomes both count as committed.
    pub fn committed(&self) -> usize {
        self.succeeded + self.duplicates
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Id of the already-committed transaction named by a duplicate error.
///
/// Only trusted when the error refers to a transaction, or to no resource at all.
fn existing_transaction_id(error: &ClassifiedError) -> Option<String> {
    match error.resource() {
        None | Some("transaction") => error.resource_id().map(str::to_string),
        Some(_) => None,
    }
}

/// Submits transactions through a retry policy and reports tri-state outcomes.
#[derive(Debug, Clone, Default)]
pub struct TransactionExecutor {
    policy: RetryPolicy,
}

impl TransactionExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn sink(&self) -> &Arc<dyn ObservabilitySink> {
        self.policy.sink()
    }

    /// Submit one transaction with retry. Never returns an error.
    pub async fn execute_transaction<F, Fut, T, E>(
        &self,
        submit: F,
        options: TransactionOptions,
    ) -> TransactionOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(submit, options, None).await
    }

    /// Submit with an idempotency key passed to every attempt.
    ///
    /// Retrying with the same key lets the service recognize a resubmission of
    /// an attempt whose response was lost, which then surfaces here as
    /// [`TransactionOutcome::Duplicate`].
    pub async fn execute_with_key<F, Fut, T, E>(
        &self,
        key: &IdempotencyKey,
        mut submit: F,
        options: TransactionOptions,
    ) -> TransactionOutcome<T>
    where
        F: FnMut(IdempotencyKey) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(|| submit(key.clone()), options, Some(key)).await
    }

    /// Submit a sequence of transactions one after another.
    ///
    /// A failed submission does not stop the batch.
    pub async fn execute_batch<I, F, Fut, T, E>(
        &self,
        submissions: I,
        options: TransactionOptions,
    ) -> BatchSummary<T>
    where
        I: IntoIterator<Item = F>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        let mut summary = BatchSummary::default();
        for submit in submissions {
            summary.push(self.execute_transaction(submit, options).await);
        }
        tracing::debug!(
            total = summary.total(),
            succeeded = summary.succeeded,
            duplicates = summary.duplicates,
            failed = summary.failed,
            "Transaction batch finished"
        );
        summary
    }

    async fn run<F, Fut, T, E>(
        &self,
        submit: F,
        options: TransactionOptions,
        key: Option<&IdempotencyKey>,
    ) -> TransactionOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        let policy = match options.max_retries {
            Some(max_retries) => self.policy.clone().with_max_retries(max_retries),
            None => self.policy.clone(),
        };

        let mut span = SpanGuard::start(
            self.sink().as_ref(),
            "ledger.transaction.execute",
            &[("transaction.max_retries", policy.options().max_retries.into())],
        );
        if let Some(key) = key {
            span.set_attribute("transaction.idempotency_key", key.as_str());
        }

        let outcome = match policy.execute(submit).await {
            Ok(transaction) => TransactionOutcome::Success { transaction },
            Err(failure) => {
                let error = classify(failure);
                match categorize_transaction_error(&error) {
                    TransactionErrorCategory::DuplicateTransaction => {
                        tracing::info!(
                            code = %error.code(),
                            idempotency_key = key.map(IdempotencyKey::as_str),
                            "Duplicate transaction treated as committed"
                        );
                        TransactionOutcome::Duplicate {
                            existing_id: existing_transaction_id(&error),
                            error,
                        }
                    }
                    category => TransactionOutcome::Failed { category, error },
                }
            }
        };

        let status = outcome.status();
        span.set_attribute("transaction.status", status.to_string());
        self.sink().record_counter(
            "ledger.transaction.outcome",
            1,
            &[("status", status.to_string().into())],
        );
        match &outcome {
            TransactionOutcome::Failed { error, .. } => span.finish_err(error),
            TransactionOutcome::Duplicate { error, .. } => {
                span.record_exception(error);
                span.finish_ok();
            }
            TransactionOutcome::Success { .. } => span.finish_ok(),
        }
        outcome
    }
}
