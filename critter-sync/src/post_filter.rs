//! Client-side filtering for filter keys the server ignores.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::source::{ResourcePage, ResourceSource};
use async_trait::async_trait;
use critter_types::{AccessKey, FetchResponse, FilterValue, QuerySpec, ResourceKind};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Decides whether an item matches a filter value.
pub type Predicate<T> = Arc<dyn Fn(&T, &FilterValue) -> bool + Send + Sync>;

/// Wraps a source and applies some filter keys locally.
///
/// When the query carries one of the registered keys, that key is removed
/// from the server query, every server page is fetched at the largest
/// page size, and the predicates run over the combined list. The result
/// has no pagination since the server's page counts no longer apply.
pub struct ClientFilteredSource<R: ResourceKind, S> {
    inner: S,
    predicates: BTreeMap<String, Predicate<R::Item>>,
    max_page_size: u32,
    page_cap: u32,
    _kind: PhantomData<fn() -> R>,
}

impl<R, S> ClientFilteredSource<R, S>
where
    R: ResourceKind,
    S: ResourceSource<R>,
{
    pub fn new(inner: S, config: &SyncConfig) -> Self {
        Self {
            inner,
            predicates: BTreeMap::new(),
            max_page_size: config.page_size_bounds.max,
            page_cap: config.client_filter_page_cap.max(1),
            _kind: PhantomData,
        }
    }

    /// Registers a local predicate for filter key `key`.
    #[must_use]
    pub fn with_predicate<F>(mut self, key: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&R::Item, &FilterValue) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(key.into(), Arc::new(predicate));
        self
    }

    fn split<'q>(&self, query: &'q QuerySpec) -> (QuerySpec, Vec<(Predicate<R::Item>, &'q FilterValue)>) {
        let mut server = query.clone();
        let mut local = Vec::new();
        for (key, value) in &query.filters {
            if let Some(predicate) = self.predicates.get(key) {
                server.filters.remove(key);
                local.push((Arc::clone(predicate), value));
            }
        }
        (server, local)
    }
}

#[async_trait]
impl<R, S> ResourceSource<R> for ClientFilteredSource<R, S>
where
    R: ResourceKind,
    S: ResourceSource<R>,
{
    async fn fetch(&self, access_key: &AccessKey, query: &QuerySpec) -> SyncResult<ResourcePage<R>> {
        let (mut server, local) = self.split(query);
        if local.is_empty() {
            return self.inner.fetch(access_key, query).await;
        }

        server.page_size = self.max_page_size;
        let mut items = Vec::new();
        let mut summary = None;

        for page in 1..=self.page_cap {
            server.page = page;
            let response = self.inner.fetch(access_key, &server).await?;
            if summary.is_none() {
                summary = response.summary;
            }
            items.extend(
                response
                    .items
                    .into_iter()
                    .filter(|item| local.iter().all(|(predicate, value)| predicate(item, value))),
            );

            let has_next = response.pagination.is_some_and(|p| p.has_next);
            if !has_next {
                debug!(
                    "{} filtered locally over {} page(s), {} match(es)",
                    R::NAME,
                    page,
                    items.len()
                );
                return Ok(FetchResponse {
                    items,
                    summary,
                    pagination: None,
                });
            }
        }

        Err(SyncError::TooManyResults { cap: self.page_cap })
    }
}
