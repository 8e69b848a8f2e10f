//! Shared test helpers: a recording observability sink and canned pages.

#![allow(dead_code)]

use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ledger_client::observability::{
    AttributeValue, Attributes, ObservabilitySink, Span, SpanStatus,
};
use ledger_client::pagination::{ListOptions, ListResponse};

/// Everything recorded for one span.
#[derive(Debug, Clone, Default)]
pub struct SpanRecord {
    pub name: String,
    pub attributes: Vec<(String, AttributeValue)>,
    pub exceptions: Vec<String>,
    pub status: Option<SpanStatus>,
    pub end_count: usize,
}

impl SpanRecord {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Sink that keeps every span and counter in memory.
#[derive(Clone, Default)]
pub struct RecordingSink {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
    counters: Arc<Mutex<Vec<(String, u64, Vec<(String, AttributeValue)>)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().unwrap().clone()
    }

    pub fn spans_named(&self, name: &str) -> Vec<SpanRecord> {
        self.spans()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }

    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, value, _)| value)
            .sum()
    }

    /// Asserts every span started was ended exactly once.
    pub fn assert_all_spans_ended_once(&self) {
        for span in self.spans() {
            assert_eq!(span.end_count, 1, "span {} ended {} times", span.name, span.end_count);
        }
    }
}

struct RecordingSpan {
    index: usize,
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl RecordingSpan {
    fn with_record(&self, f: impl FnOnce(&mut SpanRecord)) {
        let mut spans = self.spans.lock().unwrap();
        f(&mut spans[self.index]);
    }
}

impl Span for RecordingSpan {
    fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        self.with_record(|record| record.attributes.push((key.to_string(), value)));
    }

    fn record_exception(&mut self, error: &(dyn StdError + 'static)) {
        let message = error.to_string();
        self.with_record(|record| record.exceptions.push(message));
    }

    fn set_status(&mut self, status: SpanStatus) {
        self.with_record(|record| record.status = Some(status));
    }

    fn end(self: Box<Self>) {
        self.with_record(|record| record.end_count += 1);
    }
}

impl ObservabilitySink for RecordingSink {
    fn start_span(&self, name: &str, attributes: Attributes<'_>) -> Box<dyn Span> {
        let mut spans = self.spans.lock().unwrap();
        spans.push(SpanRecord {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..SpanRecord::default()
        });
        Box::new(RecordingSpan {
            index: spans.len() - 1,
            spans: self.spans.clone(),
        })
    }

    fn record_counter(&self, name: &str, value: u64, attributes: Attributes<'_>) {
        self.counters.lock().unwrap().push((
            name.to_string(),
            value,
            attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        ));
    }
}

/// Scripted list endpoint: serves pages in order and records each request.
#[derive(Clone)]
pub struct PagedEndpoint<T> {
    pages: Arc<Vec<(Vec<T>, Option<String>)>>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ListOptions>>>,
}

impl<T: Clone> PagedEndpoint<T> {
    pub fn new(pages: Vec<(Vec<T>, Option<&str>)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(items, cursor)| (items, cursor.map(str::to_string)))
                    .collect(),
            ),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested_cursors(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|options| options.cursor.clone())
            .collect()
    }

    /// Serve the page whose predecessor handed out `options.cursor`.
    pub fn serve(&self, options: ListOptions) -> ListResponse<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = match &options.cursor {
            None => 0,
            Some(cursor) => {
                self.pages
                    .iter()
                    .position(|(_, next)| next.as_ref() == Some(cursor))
                    .expect("unknown cursor")
                    + 1
            }
        };
        self.requests.lock().unwrap().push(options);
        let (items, next) = self.pages[index].clone();
        ListResponse::new(items, next)
    }
}
