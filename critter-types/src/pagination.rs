//! Collection response shapes.

use serde::{Deserialize, Serialize};

/// Server-reported pagination metadata for one page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Builds metadata for `page` given a total item count.
    pub fn from_totals(page: u32, page_size: u32, total_items: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            u32::try_from(total_items.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
        };
        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One response of the fetch contract: `{items, summary?, pagination?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse<T, S> {
    pub items: Vec<T>,
    pub summary: Option<S>,
    pub pagination: Option<Pagination>,
}

impl<T, S> FetchResponse<T, S> {
    /// A response carrying only items.
    pub fn items(items: Vec<T>) -> Self {
        Self {
            items,
            summary: None,
            pagination: None,
        }
    }

    #[must_use]
    pub fn with_summary(mut self, summary: S) -> Self {
        self.summary = Some(summary);
        self
    }

    #[must_use]
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}
