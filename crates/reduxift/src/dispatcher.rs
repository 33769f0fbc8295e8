//! Dispatcher handed to effects and middleware
//!
//! Actions dispatched here re-enter the owning store's middleware chain from
//! the beginning. A dispatcher never keeps its store alive, and one handed to
//! an effect is guarded by that effect's cancellation token.

use crate::action::{Action, ActionKind, PayloadValue};
use crate::cancel::{CancelToken, Canceller};
use std::sync::Weak;

/// What happened to a dispatched action.
///
/// Which variant comes back depends on the middleware that terminated the
/// chain.
#[derive(Debug, Clone)]
pub enum DispatchResult {
    /// The reducer ran and the new state was published.
    Applied,
    /// An effect middleware took the action over.
    Canceller(Canceller),
    /// The rest of the chain was scheduled elsewhere and will run later.
    Pending,
    /// A middleware swallowed the action and left nothing running.
    Consumed,
    /// The action was discarded: its effect was cancelled, the store is gone,
    /// or the target executor stopped.
    Dropped,
}

impl DispatchResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, DispatchResult::Applied)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DispatchResult::Pending)
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, DispatchResult::Dropped)
    }

    pub fn canceller(&self) -> Option<&Canceller> {
        match self {
            DispatchResult::Canceller(canceller) => Some(canceller),
            _ => None,
        }
    }

    pub fn into_canceller(self) -> Option<Canceller> {
        match self {
            DispatchResult::Canceller(canceller) => Some(canceller),
            _ => None,
        }
    }
}

/// Implemented by the store so dispatchers can stay independent of its state type.
pub(crate) trait DispatchTarget<K, V>: Send + Sync {
    fn dispatch_guarded(&self, action: Action<K, V>, guard: &CancelToken) -> DispatchResult;
}

/// Sends actions back through a store's middleware chain.
pub struct Dispatcher<K, V> {
    target: Weak<dyn DispatchTarget<K, V>>,
    guard: CancelToken,
}

impl<K, V> Clone for Dispatcher<K, V> {
    fn clone(&self) -> Self {
        Self {
            target: Weak::clone(&self.target),
            guard: self.guard.clone(),
        }
    }
}

impl<K: ActionKind, V: PayloadValue> Dispatcher<K, V> {
    pub(crate) fn new(target: Weak<dyn DispatchTarget<K, V>>, guard: CancelToken) -> Self {
        Self { target, guard }
    }

    /// Dispatch an action through the full middleware chain.
    ///
    /// Returns [`DispatchResult::Dropped`] without touching the store once the
    /// guarding effect has been cancelled or the store has been torn down.
    pub fn dispatch(&self, action: Action<K, V>) -> DispatchResult {
        if self.guard.is_cancelled() {
            log::debug!(
                "Dispatcher: dropping {:?}, its effect was cancelled",
                action.kind()
            );
            return DispatchResult::Dropped;
        }

        match self.target.upgrade() {
            Some(store) => store.dispatch_guarded(action, &self.guard),
            None => {
                log::debug!("Dispatcher: dropping {:?}, store is gone", action.kind());
                DispatchResult::Dropped
            }
        }
    }

    /// A dispatcher that also stops delivering once `guard` is cancelled.
    pub fn guarded(&self, guard: CancelToken) -> Self {
        Self {
            target: Weak::clone(&self.target),
            guard,
        }
    }

    pub fn guard(&self) -> &CancelToken {
        &self.guard
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_cancelled()
    }

    /// Whether the store behind this dispatcher still exists.
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}
