use crate::action::{Action, ActionKind, PayloadValue, StoreState};
use crate::dispatcher::DispatchResult;
use crate::executor::Executor;
use crate::middleware::{Middleware, MiddlewareApi, Next};

/// ThreadAffinityMiddleware - runs the rest of the chain on one execution context
///
/// On the executor's thread the action continues synchronously and `dispatch`
/// returns whatever the rest of the chain returns. From any other thread the
/// continuation is queued on the executor and `dispatch` returns
/// [`DispatchResult::Pending`]; the eventual result is discarded.
pub struct ThreadAffinityMiddleware<E> {
    executor: E,
}

impl<E: Executor> ThreadAffinityMiddleware<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

impl<S, K, V, E> Middleware<S, K, V> for ThreadAffinityMiddleware<E>
where
    S: StoreState,
    K: ActionKind,
    V: PayloadValue,
    E: Executor,
{
    fn handle(
        &self,
        _api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult {
        if self.executor.is_current() {
            return next.run(action);
        }

        let kind = action.kind().clone();
        let job = Box::new(move || {
            next.run(action);
        });

        match self.executor.execute(job) {
            Ok(()) => {
                log::trace!(
                    "ThreadAffinityMiddleware: {:?} queued on '{}'",
                    kind,
                    self.executor.name()
                );
                DispatchResult::Pending
            }
            Err(e) => {
                log::error!("ThreadAffinityMiddleware: cannot schedule {:?}: {}", kind, e);
                DispatchResult::Dropped
            }
        }
    }
}
