use crate::action::{Action, ActionKind, Payload, PayloadValue, StoreState};
use crate::dispatcher::DispatchResult;
use crate::middleware::{Middleware, MiddlewareApi, Next};

/// AsyncEffectMiddleware - starts `AsyncEffect` payloads and returns their canceller
///
/// The effect receives a dispatcher guarded by a fresh child token. The
/// canceller returned from `dispatch` flips that token and waits for any
/// reduction already in progress before cancelling the effect's own
/// canceller, so callbacks that race with cancellation are dropped even if the
/// effect ignores the request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncEffectMiddleware;

impl AsyncEffectMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Middleware<S, K, V> for AsyncEffectMiddleware {
    fn handle(
        &self,
        api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult {
        if let Payload::AsyncEffect(effect) = action.payload() {
            let guard = api.guard().child();
            let dispatcher = api.dispatcher().guarded(guard.clone());

            log::debug!("AsyncEffectMiddleware: starting {:?}", action.kind());
            let running = effect.start(dispatcher);

            let canceller = api.effect_canceller(guard);
            canceller.chain(running);
            return DispatchResult::Canceller(canceller);
        }

        next.run(action)
    }
}
