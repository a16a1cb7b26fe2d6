//! Snapshot publication for a sync engine.
//!
//! Consumers either hold a `watch::Receiver` of immutable snapshots or
//! register a callback that runs on every publish.

use crate::state::ResourceState;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

type Callback<T, S> = Arc<dyn Fn(&ResourceState<T, S>) + Send + Sync>;

struct Callbacks<T, S> {
    next_id: u64,
    entries: BTreeMap<u64, Callback<T, S>>,
}

/// Latest [`ResourceState`] of one engine plus its listeners.
pub struct ResourceStore<T, S> {
    tx: watch::Sender<Arc<ResourceState<T, S>>>,
    callbacks: Arc<Mutex<Callbacks<T, S>>>,
}

impl<T, S> ResourceStore<T, S>
where
    T: Send + Sync + 'static,
    S: Send + Sync + 'static,
{
    pub fn new(initial: ResourceState<T, S>) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self {
            tx,
            callbacks: Arc::new(Mutex::new(Callbacks {
                next_id: 0,
                entries: BTreeMap::new(),
            })),
        }
    }

    pub fn snapshot(&self) -> Arc<ResourceState<T, S>> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ResourceState<T, S>>> {
        self.tx.subscribe()
    }

    /// Calls `f` with every state published from now on. The callback is
    /// removed when the returned [`Subscription`] is dropped.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ResourceState<T, S>) + Send + Sync + 'static,
    {
        let id = {
            let mut callbacks = lock(&self.callbacks);
            let id = callbacks.next_id;
            callbacks.next_id += 1;
            callbacks.entries.insert(id, Arc::new(f));
            id
        };

        let registry: Weak<Mutex<Callbacks<T, S>>> = Arc::downgrade(&self.callbacks);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(callbacks) = registry.upgrade() {
                    lock(&callbacks).entries.remove(&id);
                }
            })),
        }
    }

    pub(crate) fn publish(&self, state: Arc<ResourceState<T, S>>) {
        self.tx.send_replace(Arc::clone(&state));

        // Callbacks run outside the lock so they may unsubscribe themselves.
        let listeners: Vec<Callback<T, S>> =
            lock(&self.callbacks).entries.values().cloned().collect();
        for listener in listeners {
            listener(&state);
        }
    }
}

fn lock<T, S>(callbacks: &Mutex<Callbacks<T, S>>) -> std::sync::MutexGuard<'_, Callbacks<T, S>> {
    callbacks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps a callback registered; dropping it unregisters.
#[must_use = "the callback is removed when the subscription is dropped"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Keeps the callback registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
