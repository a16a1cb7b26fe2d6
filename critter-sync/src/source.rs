//! Where a sync engine gets its pages from.

use crate::error::SyncResult;
use async_trait::async_trait;
use critter_api::{ApiClient, Auth};
use critter_types::{AccessKey, FetchResponse, QuerySpec, ResourceKind};
use std::marker::PhantomData;
use tracing::debug;

/// One fetched page of resource `R`.
pub type ResourcePage<R> =
    FetchResponse<<R as ResourceKind>::Item, <R as ResourceKind>::Summary>;

/// Fetch contract for one resource kind.
#[async_trait]
pub trait ResourceSource<R: ResourceKind>: Send + Sync + 'static {
    async fn fetch(&self, access_key: &AccessKey, query: &QuerySpec) -> SyncResult<ResourcePage<R>>;
}

#[async_trait]
impl<R, S> ResourceSource<R> for std::sync::Arc<S>
where
    R: ResourceKind,
    S: ResourceSource<R> + ?Sized,
{
    async fn fetch(&self, access_key: &AccessKey, query: &QuerySpec) -> SyncResult<ResourcePage<R>> {
        (**self).fetch(access_key, query).await
    }
}

/// Fetches `GET {base}/{R::PATH}?{query}` with the access key header.
pub struct HttpSource<R> {
    client: ApiClient,
    _kind: PhantomData<fn() -> R>,
}

impl<R: ResourceKind> HttpSource<R> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<R: ResourceKind> ResourceSource<R> for HttpSource<R> {
    async fn fetch(&self, access_key: &AccessKey, query: &QuerySpec) -> SyncResult<ResourcePage<R>> {
        let pairs = query.to_query_pairs();
        debug!("GET {} page {} size {}", R::PATH, query.page, query.page_size);
        let page = self
            .client
            .get_json(R::PATH, Auth::AccessKey(access_key), &pairs)
            .await?;
        Ok(page)
    }
}

/// Test doubles for driving an engine without a server.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};
    use tokio::time::Instant;

    /// A fetch waiting for the test to answer it.
    pub struct PendingCall<R: ResourceKind> {
        pub access_key: AccessKey,
        pub query: QuerySpec,
        reply: oneshot::Sender<SyncResult<ResourcePage<R>>>,
    }

    impl<R: ResourceKind> PendingCall<R> {
        /// Completes the fetch. Returns false if the engine already gave up
        /// on it (aborted or stopped).
        pub fn respond(self, result: SyncResult<ResourcePage<R>>) -> bool {
            self.reply.send(result).is_ok()
        }
    }

    /// Source whose every fetch blocks until the test responds, in any order.
    pub struct GatedSource<R: ResourceKind> {
        calls_tx: mpsc::UnboundedSender<PendingCall<R>>,
        calls_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PendingCall<R>>>,
    }

    impl<R: ResourceKind> GatedSource<R> {
        pub fn new() -> Self {
            let (calls_tx, calls_rx) = mpsc::unbounded_channel();
            Self {
                calls_tx,
                calls_rx: tokio::sync::Mutex::new(calls_rx),
            }
        }

        /// Waits for the engine to issue the next fetch.
        pub async fn next_call(&self) -> PendingCall<R> {
            self.calls_rx
                .lock()
                .await
                .recv()
                .await
                .expect("GatedSource sender lives as long as the source")
        }

        /// Returns an already-issued fetch, if any.
        pub fn try_next_call(&self) -> Option<PendingCall<R>> {
            self.calls_rx.try_lock().ok()?.try_recv().ok()
        }
    }

    impl<R: ResourceKind> Default for GatedSource<R> {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl<R: ResourceKind> ResourceSource<R> for GatedSource<R> {
        async fn fetch(&self, access_key: &AccessKey, query: &QuerySpec) -> SyncResult<ResourcePage<R>> {
            let (reply, rx) = oneshot::channel();
            let call = PendingCall {
                access_key: access_key.clone(),
                query: query.clone(),
                reply,
            };
            if self.calls_tx.send(call).is_err() {
                return Err(SyncError::ChannelClosed);
            }
            rx.await.unwrap_or(Err(SyncError::ChannelClosed))
        }
    }

    /// A fetch observed by [`ScriptedSource`].
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub at: Instant,
        pub access_key: AccessKey,
        pub query: QuerySpec,
    }

    /// Source answering from a queue of canned results, then a fallback.
    pub struct ScriptedSource<R: ResourceKind> {
        script: Mutex<VecDeque<SyncResult<ResourcePage<R>>>>,
        fallback: SyncResult<ResourcePage<R>>,
        delay: Duration,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl<R: ResourceKind> ScriptedSource<R> {
        /// Answers every fetch with `fallback` until results are queued.
        pub fn new(fallback: SyncResult<ResourcePage<R>>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                delay: Duration::ZERO,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Makes each fetch take `delay` before answering.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Queues a result for the next unanswered fetch.
        pub fn push(&self, result: SyncResult<ResourcePage<R>>) {
            self.script.lock().unwrap().push_back(result);
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl<R: ResourceKind> ResourceSource<R> for ScriptedSource<R> {
        async fn fetch(&self, access_key: &AccessKey, query: &QuerySpec) -> SyncResult<ResourcePage<R>> {
            self.calls.lock().unwrap().push(RecordedCall {
                at: Instant::now(),
                access_key: access_key.clone(),
                query: query.clone(),
            });
            let result = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            result
        }
    }
}
