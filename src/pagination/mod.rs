//! Cursor-based pagination over remote list endpoints.

mod cursor;

pub use cursor::{CursorPaginator, PageCheckpoint, PaginationState};

use std::collections::BTreeMap;
use std::future::Future;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Sort direction for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Options passed to a list endpoint. The paginator owns `cursor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct ListOptions {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
    pub sort_order: Option<SortOrder>,
    #[builder(default)]
    pub filter: BTreeMap<String, String>,
}

impl ListOptions {
    /// Query parameters in a stable order: cursor, limit, sort_order, then filters.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(3 + self.filter.len());
        if let Some(cursor) = &self.cursor {
            pairs.push(("cursor".to_string(), cursor.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sort_order".to_string(), order.to_string()));
        }
        for (key, value) in &self.filter {
            pairs.push((key.clone(), value.clone()));
        }
        pairs
    }
}

/// One page returned by a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub meta: ListMeta,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            meta: ListMeta {
                next_cursor,
                count: Some(count),
                ..ListMeta::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
    pub total: Option<u64>,
    pub count: Option<u64>,
}

/// Fetches one page of a remote collection.
///
/// Implemented for any `FnMut(ListOptions) -> impl Future<Output = Result<ListResponse<T>, E>>`,
/// so a closure over an API client is usually enough.
pub trait PageFetcher<T> {
    type Error;

    fn fetch_page(
        &mut self,
        options: ListOptions,
    ) -> impl Future<Output = Result<ListResponse<T>, Self::Error>>;
}

impl<T, E, F, Fut> PageFetcher<T> for F
where
    F: FnMut(ListOptions) -> Fut,
    Fut: Future<Output = Result<ListResponse<T>, E>>,
{
    type Error = E;

    fn fetch_page(
        &mut self,
        options: ListOptions,
    ) -> impl Future<Output = Result<ListResponse<T>, Self::Error>> {
        self(options)
    }
}
