//! Published state of one synchronized collection.

use chrono::{DateTime, Utc};
use critter_types::{FetchResponse, Pagination, QuerySpec};

/// Everything a view needs to render one collection.
///
/// At most one of `is_loading` / `is_refreshing` is set, and only while a
/// fetch is in flight. `is_loading` means nothing has been shown yet;
/// `is_refreshing` means the displayed data stays while newer data loads.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T, S> {
    pub items: Vec<T>,
    pub summary: Option<S>,
    pub pagination: Option<Pagination>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
    /// When a fetch last succeeded.
    pub last_updated: Option<DateTime<Utc>>,
    /// The query the items belong to (or are being fetched for).
    pub query: QuerySpec,
}

impl<T, S> ResourceState<T, S> {
    pub fn new(query: QuerySpec) -> Self {
        Self {
            items: Vec::new(),
            summary: None,
            pagination: None,
            is_loading: false,
            is_refreshing: false,
            error: None,
            last_updated: None,
            query,
        }
    }

    /// True once any fetch has succeeded.
    pub fn has_loaded(&self) -> bool {
        self.last_updated.is_some()
    }

    pub fn is_fetching(&self) -> bool {
        self.is_loading || self.is_refreshing
    }

    pub(crate) fn begin_fetch(&mut self, background: bool) {
        if background || self.has_loaded() {
            self.is_loading = false;
            self.is_refreshing = true;
        } else {
            self.is_loading = true;
            self.is_refreshing = false;
        }
    }

    pub(crate) fn apply_success(&mut self, response: FetchResponse<T, S>, at: DateTime<Utc>) {
        self.items = response.items;
        self.summary = response.summary;
        self.pagination = response.pagination;
        self.error = None;
        self.last_updated = Some(at);
        self.is_loading = false;
        self.is_refreshing = false;
    }

    /// Records a failure without touching the displayed data.
    pub(crate) fn apply_failure(&mut self, error: String) {
        self.error = Some(error);
        self.is_loading = false;
        self.is_refreshing = false;
    }

    /// Drops all fetched data, keeping the query.
    pub(crate) fn clear(&mut self) {
        let query = std::mem::take(&mut self.query);
        *self = Self::new(query);
    }
}
