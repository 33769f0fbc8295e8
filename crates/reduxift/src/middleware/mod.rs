//! Middleware chain
//!
//! Middleware sits between `dispatch` and the reducer:
//!
//! ```text
//! dispatch(action) → middleware[0] → middleware[1] → … → reducer → publish
//! ```
//!
//! Each middleware receives the action together with a [`Next`] continuation
//! that runs everything after it. It can:
//! - forward the action unchanged or transformed (`next.run(action)`)
//! - suppress it by never calling `next`
//! - call `next` more than once
//! - take the action over entirely, typically because its payload is an effect
//!
//! The value returned from [`Middleware::handle`] becomes the result of
//! `dispatch`.

use crate::action::{Action, ActionKind, PayloadValue, StoreState};
use crate::cancel::{CancelToken, Canceller};
use crate::dispatcher::{DispatchResult, Dispatcher};
use crate::store::StoreInner;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

pub mod async_effect;
pub mod logging;
pub mod stream_effect;
pub mod sync_effect;
pub mod thread_affinity;

pub use async_effect::AsyncEffectMiddleware;
pub use logging::{LogEntry, LogRecord, LoggingMiddleware};
pub use stream_effect::StreamEffectMiddleware;
pub use sync_effect::SyncEffectMiddleware;
pub use thread_affinity::ThreadAffinityMiddleware;

/// A link in the dispatch chain.
///
/// Middleware may be invoked concurrently from several threads, so it takes
/// `&self`; keep any mutable bookkeeping behind a lock.
pub trait Middleware<S, K, V>: Send + Sync {
    /// Handle an action
    ///
    /// - `api`: read the current state or dispatch new actions from the top of the chain
    /// - `action`: the action being dispatched
    /// - `next`: the rest of the chain, ending in the reducer
    fn handle(
        &self,
        api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult;
}

/// What a middleware may touch besides the action itself.
pub struct MiddlewareApi<'a, S, K, V> {
    store: &'a StoreInner<S, K, V>,
    guard: &'a CancelToken,
}

impl<'a, S: StoreState, K: ActionKind, V: PayloadValue> MiddlewareApi<'a, S, K, V> {
    pub(crate) fn new(store: &'a StoreInner<S, K, V>, guard: &'a CancelToken) -> Self {
        Self { store, guard }
    }

    /// Latest applied snapshot.
    pub fn state(&self) -> Arc<S> {
        self.store.state()
    }

    /// Dispatcher that re-enters the chain from the top.
    ///
    /// It carries the guard of the action being handled, so actions dispatched
    /// on behalf of a cancelled effect are dropped.
    pub fn dispatcher(&self) -> Dispatcher<K, V> {
        Dispatcher::new(self.store.dispatch_target(), self.guard.clone())
    }

    pub fn dispatch(&self, action: Action<K, V>) -> DispatchResult {
        self.dispatcher().dispatch(action)
    }

    /// Canceller for an effect whose dispatcher is guarded by `guard`.
    ///
    /// Cancelling it flips `guard`, then waits for a reduction already under
    /// way on another thread to be published. Once `cancel` returns, nothing
    /// the effect dispatched can change the state.
    pub(crate) fn effect_canceller(&self, guard: CancelToken) -> Canceller {
        let canceller = Canceller::with_token(guard);
        let store = self.store.downgrade();
        canceller.on_cancel(move || {
            if let Some(store) = store.upgrade() {
                store.settle();
            }
        });
        canceller
    }

    /// Cancellation guard of the action being handled.
    pub fn guard(&self) -> &CancelToken {
        self.guard
    }
}

/// Continuation for the rest of the chain.
///
/// `Next` is owned and `Send`, so a middleware may move it to another thread
/// and run it later. It does not keep the store alive.
pub struct Next<S, K, V> {
    store: Weak<StoreInner<S, K, V>>,
    index: usize,
    guard: CancelToken,
}

impl<S, K, V> Clone for Next<S, K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Weak::clone(&self.store),
            index: self.index,
            guard: self.guard.clone(),
        }
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Next<S, K, V> {
    pub(crate) fn new(store: Weak<StoreInner<S, K, V>>, index: usize, guard: CancelToken) -> Self {
        Self {
            store,
            index,
            guard,
        }
    }

    /// Run the remaining middleware and, at the end, the reducer.
    pub fn run(&self, action: Action<K, V>) -> DispatchResult {
        match self.store.upgrade() {
            Some(store) => store.run_from(self.index, action, &self.guard),
            None => {
                log::debug!("Next: dropping {:?}, store is gone", action.kind());
                DispatchResult::Dropped
            }
        }
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F, S, K, V> {
    handler: F,
    _types: PhantomData<fn() -> (S, K, V)>,
}

/// Turn a closure into a middleware.
///
/// ```ignore
/// let passthrough = middleware::from_fn(|_api, action, next: Next<_, _, _>| next.run(action));
/// ```
pub fn from_fn<S, K, V, F>(handler: F) -> FnMiddleware<F, S, K, V>
where
    F: Fn(&MiddlewareApi<'_, S, K, V>, Action<K, V>, Next<S, K, V>) -> DispatchResult
        + Send
        + Sync,
{
    FnMiddleware {
        handler,
        _types: PhantomData,
    }
}

impl<S, K, V, F> Middleware<S, K, V> for FnMiddleware<F, S, K, V>
where
    F: Fn(&MiddlewareApi<'_, S, K, V>, Action<K, V>, Next<S, K, V>) -> DispatchResult
        + Send
        + Sync,
{
    fn handle(
        &self,
        api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult {
        (self.handler)(api, action, next)
    }
}
