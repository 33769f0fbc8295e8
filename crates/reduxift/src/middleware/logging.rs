use crate::action::{Action, ActionKind, PayloadValue, StoreState};
use crate::dispatcher::DispatchResult;
use crate::middleware::{Middleware, MiddlewareApi, Next};
use std::fmt;
use std::sync::Arc;

/// One line emitted by [`LoggingMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// The action as it arrived at this middleware.
    Action(String),
    /// The state after the reducer applied the action.
    State(String),
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEntry::Action(action) => write!(f, "action: {}", action),
            LogEntry::State(state) => write!(f, "state: {}", state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub tag: String,
    pub entry: LogEntry,
}

type LogSink = Arc<dyn Fn(LogRecord) + Send + Sync>;
type StateFormatter<S> = Box<dyn Fn(&S) -> String + Send + Sync>;

/// LoggingMiddleware - logs every action passing through, then forwards it unchanged
///
/// Records go to the `log` facade unless a custom sink is installed. With
/// [`with_state`](Self::with_state) it also logs the state after each applied
/// reduction.
pub struct LoggingMiddleware<S> {
    tag: String,
    level: log::Level,
    sink: Option<LogSink>,
    describe_state: Option<StateFormatter<S>>,
}

impl<S> LoggingMiddleware<S> {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            level: log::Level::Debug,
            sink: None,
            describe_state: None,
        }
    }

    pub fn with_level(mut self, level: log::Level) -> Self {
        self.level = level;
        self
    }

    /// Send records to `sink` instead of the `log` facade.
    pub fn with_sink(mut self, sink: impl Fn(LogRecord) + Send + Sync + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Also log the state once an action has been applied.
    ///
    /// The snapshot is read when the reducer returns to this middleware. If
    /// other threads dispatch at the same time it may already include their
    /// transitions; subscribe to the store to see each transition's exact
    /// state.
    pub fn with_state(mut self, describe: impl Fn(&S) -> String + Send + Sync + 'static) -> Self {
        self.describe_state = Some(Box::new(describe));
        self
    }

    fn emit(&self, entry: LogEntry) {
        let record = LogRecord {
            tag: self.tag.clone(),
            entry,
        };
        match &self.sink {
            Some(sink) => sink(record),
            None => log::log!(self.level, "[{}] {}", record.tag, record.entry),
        }
    }
}

impl<S: StoreState, K: ActionKind, V: PayloadValue> Middleware<S, K, V> for LoggingMiddleware<S> {
    fn handle(
        &self,
        api: &MiddlewareApi<'_, S, K, V>,
        action: Action<K, V>,
        next: Next<S, K, V>,
    ) -> DispatchResult {
        self.emit(LogEntry::Action(format!("{:?}", action)));

        let result = next.run(action);

        if let (Some(describe), DispatchResult::Applied) = (&self.describe_state, &result) {
            self.emit(LogEntry::State(describe(&api.state())));
        }

        result
    }
}
