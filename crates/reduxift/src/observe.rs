//! Publication of state transitions
//!
//! Two ways to watch a store:
//! - synchronous observers ([`Store::subscribe`](crate::Store::subscribe)) see
//!   every transition, in reducer order, on the thread that applied it
//! - [`Transitions`] is a replay-latest async view for any number of
//!   independent consumers; a slow consumer only sees the newest transition
//!
//! Both replay the current `(state, action)` pair when they start.

use crate::action::{Action, ActionKind, PayloadValue, StoreState};
use crate::sync::lock;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// One published `(state, action)` pair.
///
/// The record replayed before any dispatch carries no action.
pub struct Transition<S, K, V> {
    pub state: Arc<S>,
    pub action: Option<Action<K, V>>,
}

impl<S, K: Clone, V: Clone> Clone for Transition<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            action: self.action.clone(),
        }
    }
}

type Observer<S, K, V> = Arc<dyn Fn(&Transition<S, K, V>) + Send + Sync>;

pub(crate) struct Publisher<S, K, V> {
    observers: Mutex<Vec<(u64, Observer<S, K, V>)>>,
    next_id: AtomicU64,
    latest: watch::Sender<Transition<S, K, V>>,
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Publisher<S, K, V> {
    pub(crate) fn new(initial: Arc<S>) -> Self {
        let (latest, _) = watch::channel(Transition {
            state: initial,
            action: None,
        });
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            latest,
        }
    }

    pub(crate) fn add(&self, observer: Observer<S, K, V>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.observers).push((id, observer));
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub(crate) fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }

    pub(crate) fn latest(&self) -> Transition<S, K, V> {
        self.latest.borrow().clone()
    }

    /// Make `transition` the latest record, then deliver it to every observer.
    ///
    /// Callers serialize publication. Observers run outside the registry lock
    /// so they may subscribe or unsubscribe from inside the callback; one that
    /// subscribes there replays this transition.
    pub(crate) fn publish(&self, transition: Transition<S, K, V>) {
        self.latest.send_replace(transition.clone());

        let observers: Vec<Observer<S, K, V>> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in &observers {
            observer(&transition);
        }
    }

    pub(crate) fn transitions(&self) -> Transitions<S, K, V> {
        Transitions {
            rx: self.latest.subscribe(),
            replayed: false,
        }
    }
}

/// Handle for a synchronous observer.
///
/// Dropping it unsubscribes; call [`detach`](Self::detach) to keep the
/// observer for as long as the store lives.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    pub fn detach(mut self) {
        self.release = None;
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// Replay-latest view of a store's transitions.
///
/// The first call to [`next`](Self::next) yields the current record
/// immediately; later calls wait for a newer one. Transitions published in
/// between two calls are coalesced. The sequence ends when the store is
/// dropped.
pub struct Transitions<S, K, V> {
    rx: watch::Receiver<Transition<S, K, V>>,
    replayed: bool,
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Transitions<S, K, V> {
    pub fn latest(&self) -> Transition<S, K, V> {
        self.rx.borrow().clone()
    }

    pub async fn next(&mut self) -> Option<Transition<S, K, V>> {
        if self.replayed {
            self.rx.changed().await.ok()?;
        }
        self.replayed = true;
        let transition = self.rx.borrow_and_update().clone();
        Some(transition)
    }

    pub fn into_stream(self) -> BoxStream<'static, Transition<S, K, V>> {
        stream::unfold(self, |mut transitions| async move {
            let transition = transitions.next().await?;
            Some((transition, transitions))
        })
        .boxed()
    }

    /// Continuous sequence of state snapshots.
    pub fn states(self) -> BoxStream<'static, Arc<S>> {
        self.into_stream()
            .map(|transition| transition.state)
            .boxed()
    }

    /// Continuous sequence of applied actions; the initial record is skipped.
    pub fn actions(self) -> BoxStream<'static, Action<K, V>> {
        self.into_stream()
            .filter_map(|transition| future::ready(transition.action))
            .boxed()
    }
}

impl<S, K, V> Clone for Transitions<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            replayed: self.replayed,
        }
    }
}
