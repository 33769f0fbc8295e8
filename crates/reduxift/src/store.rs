use crate::action::{Action, ActionKind, PayloadValue, StoreState};
use crate::cancel::CancelToken;
use crate::dispatcher::{DispatchResult, DispatchTarget, Dispatcher};
use crate::middleware::{Middleware, MiddlewareApi, Next};
use crate::observe::{Publisher, Subscription, Transition, Transitions};
use crate::reducer::Reducer;
use crate::sync::{lock, read, write};
use futures::stream::BoxStream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::thread::{self, ThreadId};

/// Store - holds the current state and runs the dispatch loop
///
/// ```text
/// dispatch(action) → middleware chain → reducer → publish (state, action)
/// ```
///
/// - The state is replaced, never mutated, on every reduction
/// - Reduction and publication are serialized across threads
/// - `state()` returns a snapshot and never waits for a running reduction
/// - Middleware, reducer and initial state are fixed at construction
///
/// `Store` is a cheap handle; clones share the same store. Dispatchers handed
/// to effects do not keep it alive, and dropping the last handle releases
/// every observer. In-flight effects are not cancelled on teardown; that is up
/// to whoever holds their cancellers.
pub struct Store<S, K, V = ()> {
    inner: Arc<StoreInner<S, K, V>>,
}

impl<S, K, V> Clone for Store<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Store<S, K, V> {
    /// Create a store. Middleware runs in the order given.
    pub fn new(
        initial_state: S,
        reducer: impl Reducer<S, K, V> + 'static,
        middleware: Vec<Box<dyn Middleware<S, K, V>>>,
    ) -> Self {
        Self::assemble(initial_state, Box::new(reducer), middleware)
    }

    fn assemble(
        initial_state: S,
        reducer: Box<dyn Reducer<S, K, V>>,
        middleware: Vec<Box<dyn Middleware<S, K, V>>>,
    ) -> Self {
        let initial_state = Arc::new(initial_state);
        let inner = Arc::new_cyclic(|me| StoreInner {
            me: Weak::clone(me),
            state: RwLock::new(Arc::clone(&initial_state)),
            reducer,
            middleware,
            publisher: Publisher::new(initial_state),
            writer: Mutex::new(()),
            publishing_on: Mutex::new(None),
            deferred: Mutex::new(VecDeque::new()),
            root: CancelToken::new(),
        });

        log::debug!(
            "Store created with {} middleware",
            inner.middleware.len()
        );
        Self { inner }
    }

    pub fn builder(
        initial_state: S,
        reducer: impl Reducer<S, K, V> + 'static,
    ) -> StoreBuilder<S, K, V> {
        StoreBuilder {
            initial_state,
            reducer: Box::new(reducer),
            middleware: Vec::new(),
        }
    }

    /// Process an action through the middleware chain and, unless a middleware
    /// takes it over, the reducer.
    pub fn dispatch(&self, action: Action<K, V>) -> DispatchResult {
        self.inner.run_from(0, action, &self.inner.root)
    }

    /// Latest applied snapshot.
    pub fn state(&self) -> Arc<S> {
        self.inner.state()
    }

    /// Dispatcher for code that must not keep the store alive.
    pub fn dispatcher(&self) -> Dispatcher<K, V> {
        Dispatcher::new(self.inner.dispatch_target(), self.inner.root.clone())
    }

    /// Observe every transition synchronously.
    ///
    /// The observer is called once right away with the latest record, then
    /// for each transition in reducer order on the thread that applied it.
    /// It may dispatch; such actions are applied after the current
    /// transition has reached every observer.
    pub fn subscribe(
        &self,
        observer: impl Fn(&Transition<S, K, V>) + Send + Sync + 'static,
    ) -> Subscription {
        let observer: Arc<dyn Fn(&Transition<S, K, V>) + Send + Sync> = Arc::new(observer);
        let publisher = &self.inner.publisher;

        let id = self.inner.serialized(|| {
            observer(&publisher.latest());
            publisher.add(Arc::clone(&observer))
        });

        let store = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(store) = store.upgrade() {
                store.publisher.remove(id);
            }
        })
    }

    /// Replay-latest view of `(state, action)` records.
    pub fn transitions(&self) -> Transitions<S, K, V> {
        self.inner.publisher.transitions()
    }

    pub fn states(&self) -> BoxStream<'static, Arc<S>> {
        self.transitions().states()
    }

    pub fn actions(&self) -> BoxStream<'static, Action<K, V>> {
        self.transitions().actions()
    }

    pub fn latest(&self) -> Transition<S, K, V> {
        self.inner.publisher.latest()
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.middleware.len()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.publisher.observer_count()
    }
}

/// Create a store with a fixed middleware list.
pub fn create_store<S: StoreState, K: ActionKind, V: PayloadValue>(
    initial_state: S,
    reducer: impl Reducer<S, K, V> + 'static,
    middleware: Vec<Box<dyn Middleware<S, K, V>>>,
) -> Store<S, K, V> {
    Store::new(initial_state, reducer, middleware)
}

/// Collects middleware in order before the store is built.
pub struct StoreBuilder<S, K, V> {
    initial_state: S,
    reducer: Box<dyn Reducer<S, K, V>>,
    middleware: Vec<Box<dyn Middleware<S, K, V>>>,
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> StoreBuilder<S, K, V> {
    /// Append a middleware; the first one added sees actions first.
    pub fn add_middleware(mut self, middleware: impl Middleware<S, K, V> + 'static) -> Self {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn add_boxed_middleware(mut self, middleware: Box<dyn Middleware<S, K, V>>) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn build(self) -> Store<S, K, V> {
        let StoreBuilder {
            initial_state,
            reducer,
            middleware,
        } = self;
        Store::assemble(initial_state, reducer, middleware)
    }
}

struct Deferred<K, V> {
    action: Action<K, V>,
    guard: CancelToken,
}

pub(crate) struct StoreInner<S, K, V> {
    me: Weak<StoreInner<S, K, V>>,
    state: RwLock<Arc<S>>,
    reducer: Box<dyn Reducer<S, K, V>>,
    middleware: Vec<Box<dyn Middleware<S, K, V>>>,
    publisher: Publisher<S, K, V>,
    /// Held while reducing and publishing.
    writer: Mutex<()>,
    /// Thread currently holding `writer`.
    publishing_on: Mutex<Option<ThreadId>>,
    /// Actions that reached the reducer from inside a publication.
    deferred: Mutex<VecDeque<Deferred<K, V>>>,
    root: CancelToken,
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> StoreInner<S, K, V> {
    pub(crate) fn state(&self) -> Arc<S> {
        Arc::clone(&read(&self.state))
    }

    pub(crate) fn dispatch_target(&self) -> Weak<dyn DispatchTarget<K, V>> {
        let target: Weak<dyn DispatchTarget<K, V>> = self.me.clone();
        target
    }

    pub(crate) fn downgrade(&self) -> Weak<Self> {
        Weak::clone(&self.me)
    }

    /// Wait until a reduction running on another thread has been published.
    ///
    /// Called after an effect's guard is flipped: any reduction that started
    /// earlier finishes first, and every later one sees the flipped guard.
    pub(crate) fn settle(&self) {
        if !self.is_publishing_here() {
            drop(lock(&self.writer));
        }
    }

    /// Run the chain starting at middleware `index`; past the end, reduce.
    pub(crate) fn run_from(
        &self,
        index: usize,
        action: Action<K, V>,
        guard: &CancelToken,
    ) -> DispatchResult {
        match self.middleware.get(index) {
            Some(middleware) => {
                let api = MiddlewareApi::new(self, guard);
                let next = Next::new(Weak::clone(&self.me), index + 1, guard.clone());
                middleware.handle(&api, action, next)
            }
            None => self.reduce_and_publish(action, guard),
        }
    }

    fn reduce_and_publish(&self, action: Action<K, V>, guard: &CancelToken) -> DispatchResult {
        if action.payload().is_effect() {
            log::warn!(
                "Store: {:?} reached the reducer with a {} payload; is its effect middleware installed?",
                action.kind(),
                action.payload().variant_name()
            );
        }

        if self.is_publishing_here() {
            log::debug!(
                "Store: deferring {:?} until the current publication finishes",
                action.kind()
            );
            lock(&self.deferred).push_back(Deferred {
                action,
                guard: guard.clone(),
            });
            return DispatchResult::Pending;
        }

        if self.serialized(|| self.apply(action, guard)) {
            DispatchResult::Applied
        } else {
            DispatchResult::Dropped
        }
    }

    /// Run `f` while holding the writer lock, then drain deferred actions.
    ///
    /// Called again on the publishing thread (from an observer), `f` runs
    /// directly and the outer call does the draining.
    fn serialized<R>(&self, f: impl FnOnce() -> R) -> R {
        if self.is_publishing_here() {
            return f();
        }

        let _writer = lock(&self.writer);
        let _publishing = Publishing::enter(&self.publishing_on);

        let result = f();
        while let Some(deferred) = self.pop_deferred() {
            self.apply(deferred.action, &deferred.guard);
        }
        result
    }

    /// Reduce one action and publish the transition. Caller holds the writer lock.
    fn apply(&self, action: Action<K, V>, guard: &CancelToken) -> bool {
        if guard.is_cancelled() {
            log::debug!(
                "Store: dropping {:?}, its effect was cancelled",
                action.kind()
            );
            return false;
        }

        let current = self.state();
        let next = Arc::new(self.reducer.reduce(&current, &action));
        *write(&self.state) = Arc::clone(&next);

        self.publisher.publish(Transition {
            state: next,
            action: Some(action),
        });
        true
    }

    fn pop_deferred(&self) -> Option<Deferred<K, V>> {
        lock(&self.deferred).pop_front()
    }

    fn is_publishing_here(&self) -> bool {
        *lock(&self.publishing_on) == Some(thread::current().id())
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> DispatchTarget<K, V> for StoreInner<S, K, V> {
    fn dispatch_guarded(&self, action: Action<K, V>, guard: &CancelToken) -> DispatchResult {
        self.run_from(0, action, guard)
    }
}

/// Marks the current thread as the publisher until dropped.
struct Publishing<'a> {
    owner: &'a Mutex<Option<ThreadId>>,
}

impl<'a> Publishing<'a> {
    fn enter(owner: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(owner) = Some(thread::current().id());
        Self { owner }
    }
}

impl Drop for Publishing<'_> {
    fn drop(&mut self) {
        *lock(self.owner) = None;
    }
}
