//! # reduxift
//!
//! A UI-agnostic, Redux-style state container with a composable middleware
//! pipeline and first-class side effects.
//!
//! ## Data flow
//!
//! ```text
//! dispatch(action) → middleware[0] → … → middleware[n] → reducer → publish
//!                         ↑                                            │
//!                         └──────────── effects dispatch ◄─────────────┘
//! ```
//!
//! - The state is an immutable snapshot replaced on every reduction
//! - Reducers are pure: side effects live in action payloads
//! - Effect middlewares start those payloads and hand back a [`Canceller`]
//! - Observers see every `(state, action)` transition in reducer order
//!
//! ## Payloads
//!
//! An [`Action`] carries one of:
//!
//! - nothing, or a plain value for the reducer
//! - a [`SyncEffect`](action::SyncEffect) that runs right away
//! - an [`AsyncEffect`](action::AsyncEffect) that reports back later
//! - a [`StreamEffect`](action::StreamEffect) turned into a sequence of actions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reduxift::{Action, Store};
//! use reduxift::middleware::{AsyncEffectMiddleware, LoggingMiddleware};
//!
//! let store = Store::builder(AppState::default(), reduce)
//!     .add_middleware(LoggingMiddleware::new("app"))
//!     .add_middleware(AsyncEffectMiddleware::new())
//!     .build();
//!
//! let _subscription = store.subscribe(|transition| render(&transition.state));
//!
//! // Keep the canceller to stop the fetch later
//! let canceller = store.dispatch(fetch_breeds()).into_canceller();
//! ```

pub mod action;
pub mod cancel;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod middleware;
pub mod observe;
pub mod reducer;
pub mod store;

mod sync;

pub use action::{Action, ActionKind, Payload, PayloadValue, StoreState};
pub use cancel::{CancelToken, Canceller};
pub use dispatcher::{DispatchResult, Dispatcher};
pub use error::{EffectError, ExecutorError};
pub use executor::{Executor, RunLoop, RunLoopHandle, WorkerThread};
pub use middleware::{Middleware, MiddlewareApi, Next};
pub use observe::{Subscription, Transition, Transitions};
pub use reducer::{reduce_region, Reducer};
pub use store::{create_store, Store, StoreBuilder};
