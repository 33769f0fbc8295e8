//! Error types surfaced by effects and executors
//!
//! None of these travel through the dispatch path. Effects turn an
//! [`EffectError`] into an ordinary action, and the thread-affinity middleware
//! reports an [`ExecutorError`] as a dropped dispatch.

use thiserror::Error;

/// Failure produced by an effect's work (a stream item, a background call).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EffectError {
    /// The effect's underlying operation failed.
    #[error("effect failed: {0}")]
    Failed(String),

    /// A stream effect terminated with an error.
    #[error("stream failed: {0}")]
    Stream(String),

    /// The effect gave up waiting for its work to complete.
    #[error("effect timed out after {0} ms")]
    TimedOut(u64),
}

impl EffectError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }
}

/// Failure to hand a job to an [`Executor`](crate::executor::Executor).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutorError {
    /// The thread that owns the execution context is gone.
    #[error("executor '{0}' is no longer running")]
    Closed(String),

    /// The executor thread could not be started.
    #[error("failed to start executor thread '{name}': {reason}")]
    Spawn { name: String, reason: String },
}
