//! Retry with bounded exponential backoff and jitter.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use tokio_util::sync::CancellationToken;

use crate::error::RawFailure;
use crate::observability::{noop_sink, ObservabilitySink, SpanGuard};

/// Caller-supplied retry predicate. Receives the raw failure, unclassified.
pub type RetryCondition = Arc<dyn Fn(&RawFailure) -> bool + Send + Sync>;

/// Source of jitter fractions in `[0, 1)`.
pub type JitterSource = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Smallest backoff a policy will use before its first retry.
pub const MIN_INITIAL_DELAY: Duration = Duration::from_millis(1);

/// Status codes retried by default: 408, 429, 500, 502, 503, 504.
pub fn default_retryable_status_codes() -> BTreeSet<u16> {
    BTreeSet::from([408, 429, 500, 502, 503, 504])
}

/// Retry configuration. Fixed for the lifetime of a [`RetryPolicy`].
#[derive(Clone, Builder)]
pub struct RetryOptions {
    /// Retries after the first attempt; `0` means a single attempt.
    #[builder(default = 3)]
    pub max_retries: u32,
    #[builder(default = Duration::from_millis(100))]
    pub initial_delay: Duration,
    #[builder(default = Duration::from_millis(1000))]
    pub max_delay: Duration,
    #[builder(default = default_retryable_status_codes())]
    pub retryable_status_codes: BTreeSet<u16>,
    /// Replaces the default predicate entirely when set.
    pub retry_condition: Option<RetryCondition>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryOptions {
    pub fn with_retry_condition(
        mut self,
        condition: impl Fn(&RawFailure) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("retryable_status_codes", &self.retryable_status_codes)
            .field("retry_condition", &self.retry_condition.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Retry policy.
///
/// Stateless per call: attempt counters live inside each `execute` future, so
/// one policy may be shared by any number of concurrent callers.
#[derive(Clone)]
pub struct RetryPolicy {
    options: RetryOptions,
    jitter: JitterSource,
    sink: Arc<dyn ObservabilitySink>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Build a policy. A zero `initial_delay` is raised to 1ms, and a
    /// `max_delay` below `initial_delay` is raised to it.
    pub fn new(mut options: RetryOptions) -> Self {
        if options.initial_delay.is_zero() {
            tracing::warn!(
                min_delay_ms = MIN_INITIAL_DELAY.as_millis() as u64,
                "initial_delay is zero; raising it"
            );
            options.initial_delay = MIN_INITIAL_DELAY;
        }
        if options.max_delay < options.initial_delay {
            tracing::warn!(
                initial_delay_ms = options.initial_delay.as_millis() as u64,
                max_delay_ms = options.max_delay.as_millis() as u64,
                "max_delay below initial_delay; raising it"
            );
            options.max_delay = options.initial_delay;
        }
        Self {
            options,
            jitter: Arc::new(rand::random::<f64>),
            sink: noop_sink(),
        }
    }

    /// Replace the jitter source. Values are clamped to `[0, 1]`.
    pub fn with_jitter(mut self, jitter: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.jitter = Arc::new(jitter);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Same policy with a different retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.options.max_retries = max_retries;
        self
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn sink(&self) -> &Arc<dyn ObservabilitySink> {
        &self.sink
    }

    /// Backoff before retry number `attempt + 1`.
    ///
    /// `min(initial_delay * 2^attempt, max_delay)`, plus up to 100% of that
    /// value again as additive jitter.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let max = self.options.max_delay;
        let base = 2u32
            .checked_pow(attempt)
            .and_then(|factor| self.options.initial_delay.checked_mul(factor))
            .map_or(max, |delay| delay.min(max));

        let fraction = (self.jitter)();
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let extra_nanos = (base.as_nanos() as f64 * fraction).round() as u64;
        base + Duration::from_nanos(extra_nanos)
    }

    /// Whether a failure should be retried.
    ///
    /// With a custom `retry_condition`, that predicate alone decides. Otherwise
    /// only domain errors whose status code is in `retryable_status_codes`
    /// are retried; generic errors, strings and unknown values never are.
    /// Cancellation is never retried.
    pub fn is_retryable(&self, failure: &RawFailure) -> bool {
        if failure.is_cancelled() {
            return false;
        }
        if let Some(condition) = &self.options.retry_condition {
            return condition(failure);
        }
        match failure {
            RawFailure::Domain(err) => err
                .status_code()
                .is_some_and(|status| self.options.retryable_status_codes.contains(&status)),
            _ => false,
        }
    }

    /// Execute an async operation with retry.
    ///
    /// Returns the first success, or the last failure unchanged once it is
    /// not retryable or `max_retries` retries have been spent. Dropping the
    /// returned future cancels the in-flight attempt or backoff sleep.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, RawFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(operation, None).await
    }

    /// Like [`execute`](Self::execute), aborting as soon as `cancel` fires.
    ///
    /// Cancellation during an attempt or a backoff sleep yields
    /// [`RawFailure::Cancelled`] and no further attempts are made.
    pub async fn execute_with_cancel<F, Fut, T, E>(
        &self,
        operation: F,
        cancel: &CancellationToken,
    ) -> Result<T, RawFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(operation, Some(cancel)).await
    }

    async fn run<F, Fut, T, E>(
        &self,
        mut operation: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, RawFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        let mut span = SpanGuard::start(
            self.sink.as_ref(),
            "ledger.retry.execute",
            &[("retry.max_retries", self.options.max_retries.into())],
        );
        let mut attempt: u32 = 0;

        loop {
            let outcome: Result<T, RawFailure> = match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(RawFailure::Cancelled),
                        result = operation() => result.map_err(Into::into),
                    }
                }
                None => operation().await.map_err(Into::into),
            };

            let failure = match outcome {
                Ok(value) => {
                    self.record_attempts(&mut span, attempt);
                    span.finish_ok();
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            if failure.is_cancelled() {
                tracing::debug!(attempt = attempt + 1, "Operation cancelled");
                self.record_attempts(&mut span, attempt);
                span.finish_err(&failure);
                return Err(failure);
            }

            if !self.is_retryable(&failure) || attempt >= self.options.max_retries {
                tracing::debug!(
                    attempt = attempt + 1,
                    max_retries = self.options.max_retries,
                    status = ?failure.status_code(),
                    error = %failure,
                    "Giving up after error"
                );
                self.record_attempts(&mut span, attempt);
                span.finish_err(&failure);
                return Err(failure);
            }

            let delay = self.calculate_delay(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_retries = self.options.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Retrying after error"
            );
            span.record_exception(&failure);

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            tracing::debug!(attempt = attempt + 1, "Backoff cancelled");
                            let cancelled = RawFailure::Cancelled;
                            self.record_attempts(&mut span, attempt);
                            span.finish_err(&cancelled);
                            return Err(cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }

            attempt += 1;
        }
    }

    fn record_attempts(&self, span: &mut SpanGuard, attempt: u32) {
        let attempts = attempt + 1;
        span.set_attribute("retry.attempts", attempts);
        self.sink
            .record_counter("ledger.retry.attempts", u64::from(attempts), &[]);
    }
}
