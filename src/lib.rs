//! ledger-client: resilient execution core for ledger service clients.
//!
//! Entity services (organizations, ledgers, accounts, transactions, balances)
//! hand their remote calls to this crate, which provides:
//!
//! - [`error`]: classification of any failure into a typed [`ClassifiedError`](error::ClassifiedError),
//!   user-facing messages and transaction failure buckets.
//! - [`util::retry`]: bounded exponential backoff with jitter and a pluggable retry predicate.
//! - [`transaction`]: idempotency-aware submission with `success | duplicate | failed` outcomes.
//! - [`pagination`]: a cursor paginator that streams large collections page by page.
//! - [`observability`]: a span/counter sink, no-op when disabled.
//!
//! # Quick Start
//!
//! ```no_run
//! use ledger_client::prelude::*;
//!
//! # async fn example() -> Result<(), RawFailure> {
//! let config = LedgerConfig::from_env().map_err(|e| RawFailure::from(e.to_string()))?;
//! let policy = RetryPolicy::new(config.retry_options()).with_sink(config.sink());
//!
//! let balance = policy
//!     .execute(|| async { Ok::<_, LedgerError>(42_u64) })
//!     .await?;
//! println!("{balance}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod pagination;
pub mod prelude;
pub mod transaction;
pub mod transport;
pub mod util;
