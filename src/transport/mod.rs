//! Transport boundary adapters.
//!
//! Connection management belongs to the caller; these helpers only translate
//! what comes back over the wire into [`RawFailure`](crate::error::RawFailure)
//! shapes the retry layer understands.

pub mod http;

pub use http::{check_response, json_or_error, response_parts_to_error, status_to_error};
