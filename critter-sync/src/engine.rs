//! The sync engine: one event-loop task per synchronized collection.
//!
//! The loop owns the collection's state and reacts to four inputs:
//!
//! - commands from [`SyncHandle`]s (query changes, refetches, stop),
//! - identity changes (a new access key restarts the collection),
//! - completed fetches (applied only if still the latest dispatched),
//! - the background poll timer.
//!
//! Every dispatched fetch carries a monotonically increasing token. A
//! completion whose token is not the latest is counted as discarded and
//! never touches the state, so the newest request always wins regardless
//! of arrival order.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::source::{ResourcePage, ResourceSource};
use crate::state::ResourceState;
use crate::store::{ResourceStore, Subscription};
use chrono::Utc;
use critter_api::ApiResult;
use critter_types::{AccessKey, IdentityState, QuerySpec, ResourceKind};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Snapshot of one collection as published by its engine.
pub type Snapshot<R> =
    Arc<ResourceState<<R as ResourceKind>::Item, <R as ResourceKind>::Summary>>;

/// Counters describing what an engine has done with its fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Fetches started.
    pub dispatched: u64,
    /// Completions written to the state.
    pub applied: u64,
    /// Completions dropped because a newer fetch had been dispatched.
    pub discarded: u64,
    /// Latest-token completions that failed.
    pub failed: u64,
}

/// Command sent to the engine event loop.
enum EngineCommand {
    /// Replace the active query and fetch it.
    SetQuery {
        query: QuerySpec,
        reply: oneshot::Sender<QuerySpec>,
    },
    /// Move to an exact page position without the page reset.
    SetPosition {
        page: u32,
        page_size: u32,
        reply: oneshot::Sender<QuerySpec>,
    },
    /// Fetch the active query again.
    Refetch {
        background: bool,
        reply: oneshot::Sender<()>,
    },
    /// Stop the loop; replies once no further state change can happen.
    Stop { reply: oneshot::Sender<()> },
}

/// Entry point for starting engines.
pub struct SyncEngine;

impl SyncEngine {
    /// Starts an engine for `R` with the default query.
    pub fn start<R: ResourceKind>(
        source: Arc<dyn ResourceSource<R>>,
        identity: watch::Receiver<IdentityState>,
        config: SyncConfig,
    ) -> SyncHandle<R> {
        let query = QuerySpec::new().with_page_size(config.default_page_size);
        Self::start_with_query(source, identity, config, query)
    }

    /// Starts an engine for `R` with an initial query.
    ///
    /// Nothing is fetched until `identity` carries an access key. Must be
    /// called within a tokio runtime.
    pub fn start_with_query<R: ResourceKind>(
        source: Arc<dyn ResourceSource<R>>,
        identity: watch::Receiver<IdentityState>,
        config: SyncConfig,
        query: QuerySpec,
    ) -> SyncHandle<R> {
        let query = bounded(&config, query);
        let store = Arc::new(ResourceStore::new(ResourceState::new(query.clone())));
        let (command_tx, command_rx) = mpsc::channel(32);
        let (stats_tx, stats_rx) = watch::channel(EngineStats::default());

        let engine = EngineLoop::<R> {
            source,
            store: Arc::clone(&store),
            state: Arc::new(ResourceState::new(query)),
            config,
            access_key: None,
            latest_token: 0,
            in_flight: JoinSet::new(),
            tokens: HashMap::new(),
            stats: EngineStats::default(),
            stats_tx,
        };
        tokio::spawn(engine.run(command_rx, identity));

        SyncHandle {
            commands: command_tx,
            store,
            stats: stats_rx,
            _kind: PhantomData,
        }
    }
}

fn bounded(config: &SyncConfig, query: QuerySpec) -> QuerySpec {
    let size = config.page_size_bounds.clamp(query.page_size);
    query.with_page_size(size)
}

enum Flow {
    Continue,
    Stop(oneshot::Sender<()>),
}

struct EngineLoop<R: ResourceKind> {
    source: Arc<dyn ResourceSource<R>>,
    store: Arc<ResourceStore<R::Item, R::Summary>>,
    state: Arc<ResourceState<R::Item, R::Summary>>,
    config: SyncConfig,
    access_key: Option<AccessKey>,
    latest_token: u64,
    in_flight: JoinSet<(u64, SyncResult<ResourcePage<R>>)>,
    /// Token of every fetch task still in `in_flight`.
    tokens: HashMap<Id, u64>,
    stats: EngineStats,
    stats_tx: watch::Sender<EngineStats>,
}

impl<R: ResourceKind> EngineLoop<R> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        mut identity: watch::Receiver<IdentityState>,
    ) {
        info!("Sync engine for {} started", R::NAME);

        let period = self.config.poll_interval();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let initial = identity.borrow_and_update().clone();
        self.on_identity(&initial, &mut poll);
        let mut identity_open = true;

        let stop_reply = loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break None;
                    };
                    if let Flow::Stop(reply) = self.on_command(command, &mut poll) {
                        break Some(reply);
                    }
                }
                changed = identity.changed(), if identity_open => {
                    if changed.is_err() {
                        debug!("identity source for {} closed, keeping current key", R::NAME);
                        identity_open = false;
                        continue;
                    }
                    let next = identity.borrow_and_update().clone();
                    self.on_identity(&next, &mut poll);
                }
                Some(joined) = self.in_flight.join_next_with_id(), if !self.in_flight.is_empty() => {
                    self.on_completion(joined);
                }
                _ = poll.tick() => {
                    self.on_poll();
                }
            }
        };

        // Aborts every in-flight fetch; nothing can reach the state after this.
        self.in_flight.shutdown().await;
        drop(commands);
        info!("Sync engine for {} stopped", R::NAME);
        if let Some(reply) = stop_reply {
            let _ = reply.send(());
        }
    }

    fn on_command(&mut self, command: EngineCommand, poll: &mut Interval) -> Flow {
        match command {
            EngineCommand::SetQuery { query, reply } => {
                let next = QuerySpec::reconcile(&self.state.query, bounded(&self.config, query));
                self.store_query(next.clone(), poll);
                let _ = reply.send(next);
                Flow::Continue
            }
            EngineCommand::SetPosition {
                page,
                page_size,
                reply,
            } => {
                let next = bounded(&self.config, self.state.query.clone().with_page_size(page_size))
                    .with_page(page.max(1));
                if next != self.state.query {
                    self.store_query(next.clone(), poll);
                }
                let _ = reply.send(next);
                Flow::Continue
            }
            EngineCommand::Refetch { background, reply } => {
                self.dispatch(background);
                if !background {
                    poll.reset();
                }
                let _ = reply.send(());
                Flow::Continue
            }
            EngineCommand::Stop { reply } => Flow::Stop(reply),
        }
    }

    fn store_query(&mut self, query: QuerySpec, poll: &mut Interval) {
        Arc::make_mut(&mut self.state).query = query;
        if self.access_key.is_some() {
            self.dispatch(false);
            poll.reset();
        } else {
            self.publish();
        }
    }

    fn on_identity(&mut self, identity: &IdentityState, poll: &mut Interval) {
        let key = identity.access_key().cloned();
        if key.is_some() && key == self.access_key {
            return;
        }

        // Any change of key invalidates what was fetched with the old one.
        let had_key = self.access_key.is_some();
        self.supersede_in_flight();
        Arc::make_mut(&mut self.state).clear();
        self.access_key = key;

        match &self.access_key {
            Some(_) => {
                if had_key {
                    info!("Access key changed, reloading {}", R::NAME);
                }
                self.dispatch(false);
                poll.reset();
            }
            None => {
                if identity.is_dead_end() {
                    debug!("{} settled without identity", R::NAME);
                }
                self.publish();
            }
        }
    }

    fn on_completion(
        &mut self,
        joined: Result<(Id, (u64, SyncResult<ResourcePage<R>>)), JoinError>,
    ) {
        let (token, result) = match joined {
            Ok((id, completion)) => {
                self.tokens.remove(&id);
                completion
            }
            Err(e) => {
                let token = self.tokens.remove(&e.id());
                if e.is_cancelled() {
                    return;
                }
                warn!("{} fetch task failed: {}", R::NAME, e);
                match token {
                    Some(token) if token == self.latest_token => {
                        (token, Err(SyncError::TaskFailed(e.to_string())))
                    }
                    _ => {
                        self.stats.discarded += 1;
                        self.publish_stats();
                        return;
                    }
                }
            }
        };

        if token != self.latest_token {
            debug!(
                "discarding stale {} response (token {}, latest {})",
                R::NAME,
                token,
                self.latest_token
            );
            self.stats.discarded += 1;
            self.publish_stats();
            return;
        }

        let state = Arc::make_mut(&mut self.state);
        match result {
            Ok(page) => {
                state.apply_success(page, Utc::now());
                self.stats.applied += 1;
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", R::NAME, e);
                state.apply_failure(e.to_string());
                self.stats.failed += 1;
            }
        }
        self.publish();
        self.publish_stats();
    }

    fn on_poll(&mut self) {
        if self.access_key.is_none() {
            return;
        }
        if !self.in_flight.is_empty() {
            debug!("{} fetch still in flight, skipping poll", R::NAME);
            return;
        }
        self.dispatch(true);
    }

    fn dispatch(&mut self, background: bool) {
        let Some(key) = self.access_key.clone() else {
            return;
        };
        self.latest_token += 1;
        let token = self.latest_token;
        let query = self.state.query.clone();

        Arc::make_mut(&mut self.state).begin_fetch(background);
        self.stats.dispatched += 1;
        self.publish();
        self.publish_stats();

        debug!(
            "dispatching {} fetch (token {}, page {}, background {})",
            R::NAME,
            token,
            query.page,
            background
        );
        let source = Arc::clone(&self.source);
        let task = self.in_flight.spawn(async move {
            let result = source.fetch(&key, &query).await;
            (token, result)
        });
        self.tokens.insert(task.id(), token);
    }

    /// Aborts every fetch started with the current access key.
    fn supersede_in_flight(&mut self) {
        self.in_flight.abort_all();
        self.in_flight.detach_all();
        self.tokens.clear();
    }

    fn publish(&self) {
        self.store.publish(Arc::clone(&self.state));
    }

    fn publish_stats(&self) {
        self.stats_tx.send_replace(self.stats);
    }
}

/// Cloneable handle to a running engine.
///
/// The engine stops when [`stop`](Self::stop) is awaited or when every
/// handle has been dropped.
pub struct SyncHandle<R: ResourceKind> {
    commands: mpsc::Sender<EngineCommand>,
    store: Arc<ResourceStore<R::Item, R::Summary>>,
    stats: watch::Receiver<EngineStats>,
    _kind: PhantomData<fn() -> R>,
}

impl<R: ResourceKind> Clone for SyncHandle<R> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            store: Arc::clone(&self.store),
            stats: self.stats.clone(),
            _kind: PhantomData,
        }
    }
}

impl<R: ResourceKind> SyncHandle<R> {
    /// Replaces the active query and fetches it. Any change other than the
    /// page number resets the page to 1; a page size outside the configured
    /// bounds is clamped. Returns the query actually stored.
    pub async fn set_query(&self, query: QuerySpec) -> SyncResult<QuerySpec> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::SetQuery { query, reply }).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Moves to `page` at `page_size` in one step. Unlike
    /// [`set_query`](Self::set_query), a page size change keeps the given
    /// page. Returns the query actually stored; nothing is fetched if it
    /// equals the active one.
    pub async fn set_position(&self, page: u32, page_size: u32) -> SyncResult<QuerySpec> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::SetPosition {
            page,
            page_size,
            reply,
        })
        .await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Fetches the active query again. A background refetch keeps the
    /// displayed data and never shows a loading state.
    pub async fn refetch(&self, background: bool) -> SyncResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Refetch { background, reply }).await?;
        rx.await.map_err(|_| SyncError::ChannelClosed)
    }

    /// Tells the engine its collection was changed by a write.
    pub async fn notify_mutation(&self) -> SyncResult<()> {
        self.refetch(false).await
    }

    /// Routes a mutation result: success and conflicts refetch, validation
    /// errors are handed back untouched.
    pub async fn settle_mutation<T>(&self, result: ApiResult<T>) -> SyncResult<T> {
        match result {
            Ok(value) => {
                self.notify_mutation().await?;
                Ok(value)
            }
            Err(e) if e.is_conflict() => {
                info!("Conflict on {} write, reloading: {}", R::NAME, e);
                self.refetch(false).await?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stops the engine: cancels polling and aborts in-flight fetches. Once
    /// this returns, the state will not change again. Stopping an already
    /// stopped engine does nothing.
    pub async fn stop(&self) {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(EngineCommand::Stop { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    /// Current state.
    pub fn state(&self) -> Snapshot<R> {
        self.store.snapshot()
    }

    /// Active query.
    pub fn query(&self) -> QuerySpec {
        self.store.snapshot().query.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<R>> {
        self.store.subscribe()
    }

    /// Registers a callback for every published state.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ResourceState<R::Item, R::Summary>) + Send + Sync + 'static,
    {
        self.store.subscribe_fn(f)
    }

    pub fn stats(&self) -> watch::Receiver<EngineStats> {
        self.stats.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn send(&self, command: EngineCommand) -> SyncResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SyncError::Stopped)
    }
}
