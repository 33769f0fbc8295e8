//! Actions and their payloads
//!
//! An [`Action`] pairs a discriminant (`kind`) with a [`Payload`]. The payload
//! is a closed sum: either inert data for the reducer or an effect that a
//! middleware runs instead of the reducer.

use crate::cancel::Canceller;
use crate::dispatcher::Dispatcher;
use crate::error::EffectError;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;

/// Bounds every action discriminant must satisfy.
pub trait ActionKind: fmt::Debug + Clone + Send + Sync + 'static {}

impl<T> ActionKind for T where T: fmt::Debug + Clone + Send + Sync + 'static {}

/// Bounds every inert payload value must satisfy.
pub trait PayloadValue: fmt::Debug + Clone + Send + Sync + 'static {}

impl<T> PayloadValue for T where T: fmt::Debug + Clone + Send + Sync + 'static {}

/// Bounds every store state must satisfy.
pub trait StoreState: Send + Sync + 'static {}

impl<T> StoreState for T where T: Send + Sync + 'static {}

type SyncEffectFn<K, V> = dyn Fn(&Dispatcher<K, V>) -> Option<Canceller> + Send + Sync;
type AsyncEffectFn<K, V> = dyn Fn(Dispatcher<K, V>) -> Canceller + Send + Sync;
type StreamSource<K, V> =
    dyn Fn() -> BoxStream<'static, Result<Action<K, V>, EffectError>> + Send + Sync;
type ErrorMapper<K, V> = dyn Fn(EffectError) -> Action<K, V> + Send + Sync;

/// Work that runs immediately on the dispatching thread.
///
/// It may dispatch further actions and may hand back a canceller for anything
/// it left running.
pub struct SyncEffect<K, V> {
    run: Arc<SyncEffectFn<K, V>>,
}

impl<K, V> SyncEffect<K, V> {
    pub fn new(
        run: impl Fn(&Dispatcher<K, V>) -> Option<Canceller> + Send + Sync + 'static,
    ) -> Self {
        Self { run: Arc::new(run) }
    }

    pub fn run(&self, dispatcher: &Dispatcher<K, V>) -> Option<Canceller> {
        (self.run)(dispatcher)
    }
}

impl<K, V> Clone for SyncEffect<K, V> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

/// Background work that calls back into the store zero or more times.
///
/// Starting it must return a [`Canceller`] synchronously.
pub struct AsyncEffect<K, V> {
    start: Arc<AsyncEffectFn<K, V>>,
}

impl<K, V> AsyncEffect<K, V> {
    pub fn new(start: impl Fn(Dispatcher<K, V>) -> Canceller + Send + Sync + 'static) -> Self {
        Self {
            start: Arc::new(start),
        }
    }

    pub fn start(&self, dispatcher: Dispatcher<K, V>) -> Canceller {
        (self.start)(dispatcher)
    }
}

impl<K, V> Clone for AsyncEffect<K, V> {
    fn clone(&self) -> Self {
        Self {
            start: Arc::clone(&self.start),
        }
    }
}

/// A lazy sequence of emissions, each turned into a follow-up action.
///
/// The source is only created when the stream middleware subscribes. An `Err`
/// item ends the sequence and is mapped to exactly one error action.
pub struct StreamEffect<K, V> {
    source: Arc<StreamSource<K, V>>,
    on_error: Arc<ErrorMapper<K, V>>,
}

impl<K: ActionKind, V: PayloadValue> StreamEffect<K, V> {
    pub fn new<T, St>(
        source: impl Fn() -> St + Send + Sync + 'static,
        on_item: impl Fn(T) -> Action<K, V> + Send + Sync + 'static,
        on_error: impl Fn(EffectError) -> Action<K, V> + Send + Sync + 'static,
    ) -> Self
    where
        T: 'static,
        St: Stream<Item = Result<T, EffectError>> + Send + 'static,
    {
        let on_item = Arc::new(on_item);
        let source = move || {
            let on_item = Arc::clone(&on_item);
            source()
                .map(move |item| item.map(|value| on_item(value)))
                .boxed()
        };

        Self {
            source: Arc::new(source),
            on_error: Arc::new(on_error),
        }
    }

    pub(crate) fn subscribe(&self) -> BoxStream<'static, Result<Action<K, V>, EffectError>> {
        (self.source)()
    }

    pub(crate) fn error_action(&self, error: EffectError) -> Action<K, V> {
        (self.on_error)(error)
    }
}

impl<K, V> Clone for StreamEffect<K, V> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            on_error: Arc::clone(&self.on_error),
        }
    }
}

/// What an action carries.
pub enum Payload<K, V> {
    None,
    Value(V),
    SyncEffect(SyncEffect<K, V>),
    AsyncEffect(AsyncEffect<K, V>),
    StreamEffect(StreamEffect<K, V>),
}

impl<K, V> Payload<K, V> {
    /// Whether a middleware is expected to take this payload over.
    pub fn is_effect(&self) -> bool {
        matches!(
            self,
            Payload::SyncEffect(_) | Payload::AsyncEffect(_) | Payload::StreamEffect(_)
        )
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Payload::None => "None",
            Payload::Value(_) => "Value",
            Payload::SyncEffect(_) => "SyncEffect",
            Payload::AsyncEffect(_) => "AsyncEffect",
            Payload::StreamEffect(_) => "StreamEffect",
        }
    }
}

impl<K, V: Clone> Clone for Payload<K, V> {
    fn clone(&self) -> Self {
        match self {
            Payload::None => Payload::None,
            Payload::Value(value) => Payload::Value(value.clone()),
            Payload::SyncEffect(effect) => Payload::SyncEffect(effect.clone()),
            Payload::AsyncEffect(effect) => Payload::AsyncEffect(effect.clone()),
            Payload::StreamEffect(effect) => Payload::StreamEffect(effect.clone()),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Payload<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Value(value) => f.debug_tuple("Value").field(value).finish(),
            other => f.write_str(other.variant_name()),
        }
    }
}

/// Immutable description of what happened or should happen.
#[derive(Clone, Debug)]
pub struct Action<K, V = ()> {
    kind: K,
    payload: Payload<K, V>,
}

impl<K, V> Action<K, V> {
    /// Action without payload.
    pub fn new(kind: K) -> Self {
        Self {
            kind,
            payload: Payload::None,
        }
    }

    pub fn with_value(kind: K, value: V) -> Self {
        Self {
            kind,
            payload: Payload::Value(value),
        }
    }

    pub fn with_payload(kind: K, payload: Payload<K, V>) -> Self {
        Self { kind, payload }
    }

    pub fn sync_effect(
        kind: K,
        run: impl Fn(&Dispatcher<K, V>) -> Option<Canceller> + Send + Sync + 'static,
    ) -> Self {
        Self::with_payload(kind, Payload::SyncEffect(SyncEffect::new(run)))
    }

    pub fn async_effect(
        kind: K,
        start: impl Fn(Dispatcher<K, V>) -> Canceller + Send + Sync + 'static,
    ) -> Self {
        Self::with_payload(kind, Payload::AsyncEffect(AsyncEffect::new(start)))
    }

    pub fn stream_effect(kind: K, effect: StreamEffect<K, V>) -> Self {
        Self::with_payload(kind, Payload::StreamEffect(effect))
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn payload(&self) -> &Payload<K, V> {
        &self.payload
    }

    /// The inert value, if this action carries one.
    pub fn value(&self) -> Option<&V> {
        match &self.payload {
            Payload::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (K, Payload<K, V>) {
        (self.kind, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[derive(Debug, Clone, PartialEq)]
    enum Kind {
        Ping,
        Load,
        Loaded,
        Failed,
    }

    #[test]
    fn test_value_accessor() {
        let action: Action<Kind, String> = Action::with_value(Kind::Loaded, "a".to_string());
        assert_eq!(action.kind(), &Kind::Loaded);
        assert_eq!(action.value(), Some(&"a".to_string()));
        assert!(!action.payload().is_effect());

        let bare: Action<Kind, String> = Action::new(Kind::Ping);
        assert_eq!(bare.value(), None);
    }

    #[test]
    fn test_effect_payloads_are_flagged() {
        let sync: Action<Kind, ()> = Action::sync_effect(Kind::Load, |_| None);
        let job: Action<Kind, ()> = Action::async_effect(Kind::Load, |_| Canceller::new());

        assert!(sync.payload().is_effect());
        assert!(job.payload().is_effect());
        assert_eq!(job.payload().variant_name(), "AsyncEffect");
    }

    #[test]
    fn test_debug_hides_effect_bodies() {
        let job: Action<Kind, ()> = Action::async_effect(Kind::Load, |_| Canceller::new());
        assert_eq!(format!("{:?}", job), "Action { kind: Load, payload: AsyncEffect }");

        let value: Action<Kind, u8> = Action::with_value(Kind::Loaded, 7);
        assert_eq!(
            format!("{:?}", value),
            "Action { kind: Loaded, payload: Value(7) }"
        );
    }

    #[tokio::test]
    async fn test_stream_effect_maps_items_and_errors() {
        let effect: StreamEffect<Kind, u32> = StreamEffect::new(
            || stream::iter(vec![Ok(1u32), Err(EffectError::stream("boom"))]),
            |n| Action::with_value(Kind::Loaded, n),
            |_| Action::new(Kind::Failed),
        );

        let items: Vec<_> = effect.subscribe().collect().await;
        assert_eq!(items.len(), 2);

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.kind(), &Kind::Loaded);
        assert_eq!(first.value(), Some(&1));

        let err = items[1].clone().unwrap_err();
        assert_eq!(effect.error_action(err).kind(), &Kind::Failed);
    }
}
