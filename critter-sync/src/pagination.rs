//! Keeps an engine's page position in step with an external cursor such
//! as a shareable link.
//!
//! External changes are pushed into the engine without being echoed back.
//! Engine-driven changes are written to the cursor sink without being
//! re-applied.

use crate::engine::SyncHandle;
use crate::error::SyncResult;
use critter_types::{PageSizeBounds, QuerySpec, ResourceKind};
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

/// Page position as carried by a link: `page=3&pageSize=50`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageCursor {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    pub fn from_query(query: &QuerySpec) -> Self {
        Self::new(query.page, query.page_size)
    }

    /// Parses `page` and `pageSize` out of a query string. Unknown keys and
    /// unparsable values are ignored.
    pub fn from_query_string(input: &str) -> Self {
        let mut cursor = Self::default();
        for pair in input.trim_start_matches('?').split('&') {
            let Some((raw_key, raw_value)) = pair.split_once('=') else {
                continue;
            };
            let (Ok(key), Ok(value)) = (
                urlencoding::decode(&raw_key.replace('+', " ")).map(|k| k.into_owned()),
                urlencoding::decode(&raw_value.replace('+', " ")).map(|v| v.into_owned()),
            ) else {
                continue;
            };
            match key.as_str() {
                "page" => cursor.page = value.trim().parse().ok(),
                "pageSize" => cursor.page_size = value.trim().parse().ok(),
                _ => {}
            }
        }
        cursor
    }

    /// Renders the cursor back into a query string.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(page) = self.page {
            parts.push(format!("page={}", urlencoding::encode(&page.to_string())));
        }
        if let Some(size) = self.page_size {
            parts.push(format!("pageSize={}", urlencoding::encode(&size.to_string())));
        }
        parts.join("&")
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// Receives engine-driven page changes.
pub trait CursorSink: Send + Sync {
    fn write(&self, cursor: PageCursor);
}

impl<F> CursorSink for F
where
    F: Fn(PageCursor) + Send + Sync,
{
    fn write(&self, cursor: PageCursor) {
        self(cursor)
    }
}

/// Two-way bridge between a [`SyncHandle`] and a [`CursorSink`].
///
/// Query changes that should reach the cursor go through
/// [`set_query`](Self::set_query) rather than the handle, so a page reset
/// caused by a filter or sort change is written out too.
pub struct PaginationCoordinator<R: ResourceKind, C> {
    handle: SyncHandle<R>,
    sink: C,
    bounds: PageSizeBounds,
    /// Position last written to or applied from the sink.
    last: Mutex<PageCursor>,
}

impl<R, C> PaginationCoordinator<R, C>
where
    R: ResourceKind,
    C: CursorSink,
{
    pub fn new(handle: SyncHandle<R>, sink: C, bounds: PageSizeBounds) -> Self {
        let last = Mutex::new(PageCursor::from_query(&handle.query()));
        Self {
            handle,
            sink,
            bounds,
            last,
        }
    }

    pub fn handle(&self) -> &SyncHandle<R> {
        &self.handle
    }

    /// Applies a cursor that changed outside the engine.
    ///
    /// Out-of-bounds sizes and page 0 are ignored. A new page size without
    /// a page lands on page 1; with a page, both are stored in one step.
    /// Nothing is fetched if the position is unchanged.
    pub async fn apply_external(&self, cursor: PageCursor) -> SyncResult<QuerySpec> {
        let current = self.handle.query();

        let size = match cursor.page_size {
            Some(size) if !self.bounds.contains(size) => {
                debug!("ignoring out-of-bounds page size {} from cursor", size);
                current.page_size
            }
            Some(size) => size,
            None => current.page_size,
        };
        let page = match cursor.page {
            Some(0) => {
                debug!("ignoring page 0 from cursor");
                None
            }
            page => page,
        };
        let size_changed = size != current.page_size;
        let page = page.unwrap_or(if size_changed { 1 } else { current.page });

        let mut last = self.last.lock().await;
        if !size_changed && page == current.page {
            *last = PageCursor::from_query(&current);
            return Ok(current);
        }
        let stored = self.handle.set_position(page, size).await?;
        *last = PageCursor::from_query(&stored);
        Ok(stored)
    }

    /// Replaces the engine's query and writes the resulting position to the
    /// sink if it moved.
    pub async fn set_query(&self, query: QuerySpec) -> SyncResult<QuerySpec> {
        let stored = self.handle.set_query(query).await?;
        self.publish(&stored).await;
        Ok(stored)
    }

    /// Moves to the next page unless the engine reports there is none. A
    /// result without pagination (such as a client-filtered one) is a
    /// single page.
    pub async fn next_page(&self) -> SyncResult<QuerySpec> {
        let state = self.handle.state();
        if !state.pagination.is_some_and(|p| p.has_next) {
            return Ok(state.query.clone());
        }
        self.go_to_page(state.query.page.saturating_add(1)).await
    }

    /// Moves to the previous page; stays put on page 1.
    pub async fn prev_page(&self) -> SyncResult<QuerySpec> {
        let current = self.handle.query();
        if current.page <= 1 {
            return Ok(current);
        }
        self.go_to_page(current.page - 1).await
    }

    pub async fn go_to_page(&self, page: u32) -> SyncResult<QuerySpec> {
        let current = self.handle.query();
        self.set_query(current.with_page(page.max(1))).await
    }

    /// Changes the page size (clamped into bounds); the page resets to 1.
    pub async fn set_page_size(&self, size: u32) -> SyncResult<QuerySpec> {
        let current = self.handle.query();
        self.set_query(current.with_page_size(self.bounds.clamp(size)))
            .await
    }

    async fn publish(&self, stored: &QuerySpec) {
        let cursor = PageCursor::from_query(stored);
        let mut last = self.last.lock().await;
        if *last != cursor {
            *last = cursor;
            self.sink.write(cursor);
        }
    }
}
