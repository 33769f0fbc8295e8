use crate::action::{Action, ActionKind, Payload, PayloadValue, StoreState};
use crate::dispatcher::DispatchResult;
use crate::middleware::{Middleware, MiddlewareApi, Next};

/// SyncEffectMiddleware - runs `SyncEffect` payloads on the dispatching thread
///
/// The effect never reaches the reducer. If it hands back a canceller for work
/// it left running, that canceller becomes the result of `dispatch`; otherwise
/// the action is reported as consumed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncEffectMiddleware;

impl SyncEffectMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Middleware<S, K, V> for SyncEffectMiddleware {
    fn handle(
        &self,
        api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult {
        if let Payload::SyncEffect(effect) = action.payload() {
            let guard = api.guard().child();
            let dispatcher = api.dispatcher().guarded(guard.clone());

            return match effect.run(&dispatcher) {
                Some(running) => {
                    let canceller = api.effect_canceller(guard);
                    canceller.chain(running);
                    DispatchResult::Canceller(canceller)
                }
                None => DispatchResult::Consumed,
            };
        }

        next.run(action)
    }
}
