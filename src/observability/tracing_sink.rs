//! Sink that maps spans onto the `tracing` ecosystem.

use std::error::Error as StdError;
use std::time::Instant;

use super::{AttributeValue, Attributes, ObservabilitySink, Span, SpanStatus};

/// Emits each span as a `tracing` span named `ledger.operation`.
///
/// The operation name goes into the `otel.name` field; attributes, exceptions
/// and the final status are events recorded inside the span.
#[derive(Debug, Clone)]
pub struct TracingSink {
    service_name: String,
}

impl TracingSink {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new("ledger-client")
    }
}

struct TracingSpan {
    span: tracing::Span,
    started: Instant,
    status: SpanStatus,
}

impl Span for TracingSpan {
    fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        tracing::debug!(parent: &self.span, key, value = %value, "span attribute");
    }

    fn record_exception(&mut self, error: &(dyn StdError + 'static)) {
        tracing::debug!(parent: &self.span, error = %error, "span exception");
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.status = status;
    }

    fn end(self: Box<Self>) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match &self.status {
            SpanStatus::Ok => {
                self.span.record("otel.status_code", "OK");
                tracing::debug!(parent: &self.span, elapsed_ms, "span end");
            }
            SpanStatus::Error(message) => {
                self.span.record("otel.status_code", "ERROR");
                tracing::debug!(
                    parent: &self.span,
                    elapsed_ms,
                    message = message.as_deref().unwrap_or(""),
                    "span end"
                );
            }
        }
    }
}

impl ObservabilitySink for TracingSink {
    fn start_span(&self, name: &str, attributes: Attributes<'_>) -> Box<dyn Span> {
        let span = tracing::info_span!(
            "ledger.operation",
            otel.name = name,
            service = %self.service_name,
            otel.status_code = tracing::field::Empty,
        );
        for (key, value) in attributes {
            tracing::debug!(parent: &span, key = *key, value = %value, "span attribute");
        }
        Box::new(TracingSpan {
            span,
            started: Instant::now(),
            status: SpanStatus::Ok,
        })
    }

    fn record_counter(&self, name: &str, value: u64, attributes: Attributes<'_>) {
        let labels = attributes
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        tracing::trace!(
            service = %self.service_name,
            counter = name,
            value,
            labels = %labels,
            "counter"
        );
    }
}
