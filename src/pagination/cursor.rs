//! Stateful cursor paginator.

use std::sync::Arc;

use futures::Stream;
use serde::{Deserialize, Serialize};

use super::{ListOptions, PageFetcher};
use crate::observability::{noop_sink, ObservabilitySink, SpanGuard, SpanStatus};

/// Position of a paginator. Mutated only by the paginator's own fetches.
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
    next_cursor: Option<String>,
    has_more_pages: bool,
    current_page: Option<Vec<T>>,
    pages_fetched: u64,
    items_fetched: u64,
}

impl<T> Default for PaginationState<T> {
    fn default() -> Self {
        Self {
            next_cursor: None,
            has_more_pages: true,
            current_page: None,
            pages_fetched: 0,
            items_fetched: 0,
        }
    }
}

impl<T> PaginationState<T> {
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    pub fn current_page(&self) -> Option<&[T]> {
        self.current_page.as_deref()
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    pub fn items_fetched(&self) -> u64 {
        self.items_fetched
    }
}

/// Immutable snapshot of a paginator's position.
///
/// Hand a checkpoint to [`CursorPaginator::resume`] to continue from the same
/// place in a separate paginator instead of sharing one paginator between tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCheckpoint {
    pub cursor: Option<String>,
    pub has_more: bool,
}

/// Iterates a remote paged collection one page at a time.
///
/// The paginator owns its position. Calls to [`next`](Self::next) take
/// `&mut self`, so one instance cannot have two fetches in flight.
pub struct CursorPaginator<T, P> {
    fetcher: P,
    options: ListOptions,
    state: PaginationState<T>,
    sink: Arc<dyn ObservabilitySink>,
}

impl<T, P> CursorPaginator<T, P>
where
    P: PageFetcher<T>,
{
    /// `options.cursor` is ignored; pagination starts from the first page.
    pub fn new(fetcher: P, options: ListOptions) -> Self {
        Self {
            fetcher,
            options,
            state: PaginationState::default(),
            sink: noop_sink(),
        }
    }

    /// Continue from a checkpoint taken on another paginator.
    pub fn resume(fetcher: P, options: ListOptions, checkpoint: PageCheckpoint) -> Self {
        let mut paginator = Self::new(fetcher, options);
        paginator.state.next_cursor = checkpoint.cursor;
        paginator.state.has_more_pages = checkpoint.has_more;
        paginator
    }

    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Whether another page may exist. Never makes a remote call.
    pub fn has_next(&self) -> bool {
        self.state.has_more_pages
    }

    pub fn state(&self) -> &PaginationState<T> {
        &self.state
    }

    pub fn checkpoint(&self) -> PageCheckpoint {
        PageCheckpoint {
            cursor: self.state.next_cursor.clone(),
            has_more: self.state.has_more_pages,
        }
    }

    /// Fetch the next page.
    ///
    /// Once the collection is exhausted this returns an empty slice without
    /// calling the fetcher. A fetch error is returned unchanged and leaves the
    /// position untouched, so the same call can be retried.
    pub async fn next(&mut self) -> Result<&[T], P::Error> {
        if !self.state.has_more_pages {
            return Ok(&[]);
        }
        let items = self.fetch_next().await?;
        Ok(self.state.current_page.insert(items).as_slice())
    }

    /// The last fetched page, fetching the first one if nothing was fetched yet.
    pub async fn get_current_page(&mut self) -> Result<&[T], P::Error> {
        if self.state.current_page.is_none() {
            return self.next().await;
        }
        Ok(self.state.current_page.as_deref().unwrap_or_default())
    }

    /// Drain every remaining page into one vector.
    pub async fn get_all_items(&mut self) -> Result<Vec<T>, P::Error>
    where
        T: Clone,
    {
        let mut items = Vec::new();
        while self.has_next() {
            items.extend_from_slice(self.next().await?);
        }
        Ok(items)
    }

    /// Visit every remaining item. A page is fetched only after every item of
    /// the previous page has been visited.
    pub async fn for_each_item(&mut self, mut visit: impl FnMut(&T)) -> Result<(), P::Error> {
        while self.has_next() {
            for item in self.next().await? {
                visit(item);
            }
        }
        Ok(())
    }

    /// Turn the paginator into a stream of items.
    ///
    /// The next page is requested only when the consumer has pulled every item
    /// of the current one. The stream ends after the first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<T, P::Error>> {
        async_stream::try_stream! {
            while self.has_next() {
                let page = self.fetch_next().await?;
                for item in page {
                    yield item;
                }
            }
        }
    }

    async fn fetch_next(&mut self) -> Result<Vec<T>, P::Error> {
        let mut options = self.options.clone();
        options.cursor = self.state.next_cursor.clone();

        let page_number = self.state.pages_fetched + 1;
        let mut span = SpanGuard::start(
            self.sink.as_ref(),
            "ledger.pagination.next",
            &[
                ("pagination.page", page_number.into()),
                ("pagination.has_cursor", options.cursor.is_some().into()),
            ],
        );

        let response = match self.fetcher.fetch_page(options).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(page = page_number, "Page fetch failed");
                span.finish_status(SpanStatus::Error(Some("page fetch failed".to_string())));
                return Err(err);
            }
        };

        let next_cursor = response.meta.next_cursor.filter(|cursor| !cursor.is_empty());
        let items = response.items;

        self.state.has_more_pages = next_cursor.is_some();
        self.state.next_cursor = next_cursor;
        self.state.pages_fetched += 1;
        self.state.items_fetched += items.len() as u64;

        tracing::debug!(
            page = page_number,
            items = items.len(),
            has_more = self.state.has_more_pages,
            "Fetched page"
        );
        span.set_attribute("pagination.items", items.len());
        span.set_attribute("pagination.has_more", self.state.has_more_pages);
        self.sink.record_counter("ledger.pagination.pages", 1, &[]);
        span.finish_ok();

        Ok(items)
    }
}
