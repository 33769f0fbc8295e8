use crate::action::{Action, ActionKind, Payload, PayloadValue, StoreState};
use crate::dispatcher::DispatchResult;
use crate::middleware::{Middleware, MiddlewareApi, Next};
use futures::StreamExt;
use tokio::runtime::Handle;

/// StreamEffectMiddleware - subscribes to `StreamEffect` payloads
///
/// The stream is driven on the given tokio runtime. Every emitted item is
/// dispatched as its follow-up action, in emission order. Completion
/// dispatches nothing; an error dispatches exactly one error action and ends
/// the subscription. `dispatch` returns a canceller that stops the
/// subscription.
pub struct StreamEffectMiddleware {
    runtime: Handle,
}

impl StreamEffectMiddleware {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Middleware<S, K, V> for StreamEffectMiddleware {
    fn handle(
        &self,
        api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult {
        if let Payload::StreamEffect(effect) = action.payload() {
            let guard = api.guard().child();
            let dispatcher = api.dispatcher().guarded(guard.clone());
            let effect = effect.clone();
            let mut items = effect.subscribe();
            let label = format!("{:?}", action.kind());

            log::debug!("StreamEffectMiddleware: subscribing to {}", label);
            let task = self.runtime.spawn(async move {
                while let Some(item) = items.next().await {
                    if dispatcher.is_cancelled() {
                        break;
                    }
                    match item {
                        Ok(follow_up) => {
                            dispatcher.dispatch(follow_up);
                        }
                        Err(err) => {
                            log::debug!("StreamEffectMiddleware: {} failed: {}", label, err);
                            dispatcher.dispatch(effect.error_action(err));
                            return;
                        }
                    }
                }
                log::debug!("StreamEffectMiddleware: {} finished", label);
            });

            let canceller = api.effect_canceller(guard);
            let subscription = task.abort_handle();
            canceller.on_cancel(move || subscription.abort());
            return DispatchResult::Canceller(canceller);
        }

        next.run(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EffectError;
    use crate::store::Store;
    use crate::action::StreamEffect;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Kind {
        Watch,
        Item,
        Failed,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Value {
        Number(u32),
        Error(String),
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Feed {
        items: Vec<u32>,
        error: Option<String>,
    }

    fn feed(state: &Feed, action: &Action<Kind, Value>) -> Feed {
        let mut next = state.clone();
        match (action.kind(), action.value()) {
            (Kind::Item, Some(Value::Number(n))) => next.items.push(*n),
            (Kind::Failed, Some(Value::Error(message))) => next.error = Some(message.clone()),
            _ => {}
        }
        next
    }

    fn watch(items: Vec<Result<u32, EffectError>>) -> Action<Kind, Value> {
        let effect = StreamEffect::new(
            move || stream::iter(items.clone()),
            |n| Action::with_value(Kind::Item, Value::Number(n)),
            |err| Action::with_value(Kind::Failed, Value::Error(err.to_string())),
        );
        Action::stream_effect(Kind::Watch, effect)
    }

    fn recording_store() -> (Store<Feed, Kind, Value>, Arc<Mutex<Vec<Kind>>>) {
        let store = Store::builder(Feed::default(), feed)
            .add_middleware(StreamEffectMiddleware::new(Handle::current()))
            .build();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        store
            .subscribe(move |transition| {
                if let Some(action) = &transition.action {
                    sink.lock().unwrap().push(action.kind().clone());
                }
            })
            .detach();
        (store, seen)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_each_item_becomes_one_action_in_order() {
        let (store, seen) = recording_store();

        let result = store.dispatch(watch(vec![Ok(1), Ok(2), Ok(3)]));
        assert!(result.canceller().is_some());
        settle().await;

        assert_eq!(store.state().items, vec![1, 2, 3]);
        assert_eq!(store.state().error, None);
        assert_eq!(*seen.lock().unwrap(), vec![Kind::Item, Kind::Item, Kind::Item]);
    }

    #[tokio::test]
    async fn test_error_dispatches_exactly_one_error_action() {
        let (store, seen) = recording_store();

        store.dispatch(watch(vec![
            Ok(7),
            Err(EffectError::stream("socket closed")),
            Ok(8),
        ]));
        settle().await;

        assert_eq!(store.state().items, vec![7]);
        assert_eq!(
            store.state().error.as_deref(),
            Some("stream failed: socket closed")
        );
        assert_eq!(*seen.lock().unwrap(), vec![Kind::Item, Kind::Failed]);
    }

    #[tokio::test]
    async fn test_empty_stream_dispatches_nothing() {
        let (store, seen) = recording_store();

        store.dispatch(watch(Vec::new()));
        settle().await;

        assert_eq!(*store.state(), Feed::default());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_subscription() {
        let (store, _seen) = recording_store();

        let ticks = StreamEffect::new(
            || {
                stream::unfold(0u32, |n| async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Some((Ok(n), n + 1))
                })
            },
            |n| Action::with_value(Kind::Item, Value::Number(n)),
            |err| Action::with_value(Kind::Failed, Value::Error(err.to_string())),
        );
        let canceller = store
            .dispatch(Action::stream_effect(Kind::Watch, ticks))
            .into_canceller()
            .unwrap();

        canceller.cancel();
        settle().await;

        assert!(store.state().items.is_empty());
    }
}
