//! Observability sink: spans and counters around core operations.
//!
//! Every retry, transaction and pagination operation opens a span through an
//! [`ObservabilitySink`], tags it, and ends it exactly once. [`SpanGuard`]
//! enforces the "exactly once" part: [`Span::end`] consumes the span, and a
//! guard that is dropped without being finished ends the span itself, which
//! covers early returns and cancelled futures.

mod tracing_sink;

pub use tracing_sink::TracingSink;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Value attached to a span or counter.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => f.write_str(v),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for AttributeValue {
    fn from(v: u64) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Key/value pairs supplied when a span starts or a counter is bumped.
pub type Attributes<'a> = &'a [(&'a str, AttributeValue)];

/// Final status of a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    Ok,
    Error(Option<String>),
}

/// One in-flight span. Spans are independent: ending one never affects another.
pub trait Span: Send {
    fn set_attribute(&mut self, key: &str, value: AttributeValue);

    fn record_exception(&mut self, error: &(dyn StdError + 'static));

    fn set_status(&mut self, status: SpanStatus);

    /// Close the span. Consumes it, so a span cannot be ended twice.
    fn end(self: Box<Self>);
}

/// Recorder for spans and counters. Must tolerate concurrent span creation.
pub trait ObservabilitySink: Send + Sync {
    fn start_span(&self, name: &str, attributes: Attributes<'_>) -> Box<dyn Span>;

    fn record_counter(&self, _name: &str, _value: u64, _attributes: Attributes<'_>) {}
}

/// Sink used when observability is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

struct NoopSpan;

impl Span for NoopSpan {
    fn set_attribute(&mut self, _key: &str, _value: AttributeValue) {}
    fn record_exception(&mut self, _error: &(dyn StdError + 'static)) {}
    fn set_status(&mut self, _status: SpanStatus) {}
    fn end(self: Box<Self>) {}
}

impl ObservabilitySink for NoopSink {
    fn start_span(&self, _name: &str, _attributes: Attributes<'_>) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }
}

/// Shared handle to a sink, defaulting to [`NoopSink`].
pub fn noop_sink() -> Arc<dyn ObservabilitySink> {
    Arc::new(NoopSink)
}

/// Owns an open span and guarantees it is ended exactly once.
pub struct SpanGuard {
    span: Option<Box<dyn Span>>,
}

impl SpanGuard {
    pub fn start(sink: &dyn ObservabilitySink, name: &str, attributes: Attributes<'_>) -> Self {
        Self {
            span: Some(sink.start_span(name, attributes)),
        }
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttributeValue>) {
        if let Some(span) = self.span.as_mut() {
            span.set_attribute(key, value.into());
        }
    }

    pub fn record_exception(&mut self, error: &(dyn StdError + 'static)) {
        if let Some(span) = self.span.as_mut() {
            span.record_exception(error);
        }
    }

    /// Mark the span successful and end it.
    pub fn finish_ok(mut self) {
        if let Some(mut span) = self.span.take() {
            span.set_status(SpanStatus::Ok);
            span.end();
        }
    }

    /// End the span with an explicit status.
    pub fn finish_status(mut self, status: SpanStatus) {
        if let Some(mut span) = self.span.take() {
            span.set_status(status);
            span.end();
        }
    }

    /// Record the error, mark the span failed and end it.
    pub fn finish_err(mut self, error: &(dyn StdError + 'static)) {
        if let Some(mut span) = self.span.take() {
            span.record_exception(error);
            span.set_status(SpanStatus::Error(Some(error.to_string())));
            span.end();
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if let Some(mut span) = self.span.take() {
            span.set_status(SpanStatus::Error(Some("dropped before completion".to_string())));
            span.end();
        }
    }
}
