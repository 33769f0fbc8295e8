//! Cooperative cancellation for in-flight effects
//!
//! A [`Canceller`] is the capability handed back to whoever dispatched an
//! effect. A [`CancelToken`] is the read-only side the effect (and the store)
//! consult before producing more work.

use crate::sync::lock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};

/// Read-only cancellation flag.
///
/// Tokens form a tree: cancelling a token cancels every token derived from it
/// with [`child`](Self::child), however deep. Cancellation is pushed down the
/// tree when it happens, so checking a token never walks it. Once the last
/// clone of a token is dropped its children are handed to its parent, which
/// keeps chains of effects that start one another shallow.
pub struct CancelToken {
    node: Arc<Node>,
}

struct Node {
    cancelled: AtomicBool,
    /// Live `CancelToken`s pointing at this node.
    handles: AtomicUsize,
    /// Held for every structural change anywhere in the tree.
    tree: Arc<Mutex<()>>,
    links: Mutex<Links>,
}

#[derive(Default)]
struct Links {
    parent: Option<Arc<Node>>,
    children: Vec<Arc<Node>>,
}

impl Node {
    fn new(tree: Arc<Mutex<()>>, parent: Option<Arc<Node>>, cancelled: bool) -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(cancelled),
            handles: AtomicUsize::new(1),
            tree,
            links: Mutex::new(Links {
                parent,
                children: Vec::new(),
            }),
        })
    }

    /// Unlink a node no token refers to any more; its children move up.
    fn detach(self: &Arc<Self>) {
        let _tree = lock(&self.tree);
        let (parent, children) = {
            let mut links = lock(&self.links);
            (links.parent.take(), std::mem::take(&mut links.children))
        };

        match parent {
            Some(parent) => {
                let mut parent_links = lock(&parent.links);
                parent_links
                    .children
                    .retain(|child| !Arc::ptr_eq(child, self));
                for child in &children {
                    lock(&child.links).parent = Some(Arc::clone(&parent));
                }
                parent_links.children.extend(children);
            }
            None => {
                for child in &children {
                    lock(&child.links).parent = None;
                }
            }
        }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            node: Node::new(Arc::new(Mutex::new(())), None, false),
        }
    }

    /// Create a token that is cancelled together with `self`.
    pub fn child(&self) -> Self {
        let tree = Arc::clone(&self.node.tree);
        let _tree = lock(&self.node.tree);

        if self.node.cancelled.load(Ordering::SeqCst) {
            return Self {
                node: Node::new(tree, None, true),
            };
        }

        let node = Node::new(tree, Some(Arc::clone(&self.node)), false);
        lock(&self.node.links).children.push(Arc::clone(&node));
        Self { node }
    }

    pub fn is_cancelled(&self) -> bool {
        self.node.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel this token and all of its descendants. Returns `true` only for
    /// the call that actually cancelled it.
    pub(crate) fn cancel(&self) -> bool {
        let _tree = lock(&self.node.tree);
        if self.node.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }

        let (parent, mut pending) = {
            let mut links = lock(&self.node.links);
            (links.parent.take(), std::mem::take(&mut links.children))
        };
        if let Some(parent) = parent {
            lock(&parent.links)
                .children
                .retain(|child| !Arc::ptr_eq(child, &self.node));
        }

        // Cancelled nodes leave the tree; nothing is left to propagate to them.
        while let Some(node) = pending.pop() {
            node.cancelled.store(true, Ordering::SeqCst);
            let mut links = lock(&node.links);
            links.parent = None;
            pending.append(&mut links.children);
        }
        true
    }
}

impl Clone for CancelToken {
    fn clone(&self) -> Self {
        self.node.handles.fetch_add(1, Ordering::Relaxed);
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl Drop for CancelToken {
    fn drop(&mut self) {
        if self.node.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.node.detach();
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

type CancelHook = Box<dyn FnOnce() + Send>;

struct CancellerInner {
    token: CancelToken,
    /// Set by the first `cancel` on this canceller, independent of the token.
    fired: AtomicBool,
    hooks: Mutex<Vec<CancelHook>>,
}

/// Idempotent handle that asks an effect to stop.
///
/// Cancelling sets the guard token (so the store discards anything the effect
/// dispatches afterwards) and runs the registered hooks exactly once, in
/// registration order. Cancelling again, or after the effect finished on its
/// own, does nothing.
#[derive(Clone)]
pub struct Canceller {
    inner: Arc<CancellerInner>,
}

impl Canceller {
    pub fn new() -> Self {
        Self::with_token(CancelToken::new())
    }

    /// Build a canceller that flips `token` when cancelled.
    pub fn with_token(token: CancelToken) -> Self {
        Self {
            inner: Arc::new(CancellerInner {
                token,
                fired: AtomicBool::new(false),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn from_fn(hook: impl FnOnce() + Send + 'static) -> Self {
        let canceller = Self::new();
        canceller.on_cancel(hook);
        canceller
    }

    /// Cancel a tokio task by aborting it.
    pub fn from_abort(handle: AbortHandle) -> Self {
        Self::from_fn(move || handle.abort())
    }

    pub fn from_task<T>(task: &JoinHandle<T>) -> Self {
        Self::from_abort(task.abort_handle())
    }

    pub fn token(&self) -> CancelToken {
        self.inner.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Register a hook to run on cancellation.
    ///
    /// If this canceller was already cancelled the hook runs immediately.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        {
            let mut hooks = lock(&self.inner.hooks);
            if !self.inner.fired.load(Ordering::SeqCst) {
                hooks.push(Box::new(hook));
                return;
            }
        }
        hook();
    }

    /// Cancel `other` whenever this canceller is cancelled.
    pub fn chain(&self, other: Canceller) {
        self.on_cancel(move || other.cancel());
    }

    pub fn cancel(&self) {
        let hooks = {
            let mut hooks = lock(&self.inner.hooks);
            if self.inner.fired.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *hooks)
        };
        self.inner.token.cancel();

        log::debug!("Canceller: running {} cancel hook(s)", hooks.len());
        for hook in hooks {
            hook();
        }
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let canceller = Canceller::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        canceller.cancel();
        canceller.cancel();
        canceller.clone().cancel();

        assert!(canceller.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_registered_after_cancel_runs_immediately() {
        let canceller = Canceller::new();
        canceller.cancel();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        canceller.on_cancel(move || flag.store(true, Ordering::SeqCst));

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_child_token_follows_parent() {
        let parent = Canceller::new();
        let child = parent.token().child();
        let grandchild = child.child();

        assert!(!grandchild.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_child_cancel_does_not_touch_parent() {
        let parent = CancelToken::new();
        let child = Canceller::with_token(parent.child());

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_deep_chain_cancels_without_recursion() {
        let root = CancelToken::new();
        let mut chain = vec![root.child()];
        for _ in 0..200_000 {
            let next = chain[chain.len() - 1].child();
            chain.push(next);
        }

        let last = &chain[chain.len() - 1];
        assert!(!last.is_cancelled());

        assert!(chain[0].cancel());
        assert!(last.is_cancelled());
        assert!(!root.is_cancelled());
        drop(chain);
    }

    #[test]
    fn test_dropped_link_keeps_descendants_attached() {
        let root = CancelToken::new();
        let mut current = root.child();
        for _ in 0..1_000 {
            // Only the newest token is kept, like an effect that restarts itself.
            current = current.child();
        }

        assert_eq!(lock(&root.node.links).children.len(), 1);
        assert!(root.cancel());
        assert!(current.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_token_starts_cancelled() {
        let parent = CancelToken::new();
        parent.cancel();
        assert!(parent.child().is_cancelled());
    }

    #[test]
    fn test_cancelling_child_keeps_its_own_hooks() {
        let parent = Canceller::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let child = Canceller::with_token(parent.token().child());
        child.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        parent.cancel();
        assert!(child.is_cancelled());

        child.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chain_cancels_downstream() {
        let upstream = Canceller::new();
        let downstream = Canceller::new();
        upstream.chain(downstream.clone());

        upstream.cancel();
        assert!(downstream.is_cancelled());
    }

    #[tokio::test]
    async fn test_from_task_aborts() {
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });
        let canceller = Canceller::from_task(&task);

        canceller.cancel();
        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
