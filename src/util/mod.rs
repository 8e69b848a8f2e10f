//! Utility modules: retry.

pub mod retry;
