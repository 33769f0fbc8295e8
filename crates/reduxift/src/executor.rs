//! Execution contexts for the thread-affinity middleware
//!
//! An [`Executor`] names one thread on which state changes must happen (for
//! instance the thread that owns the UI) and accepts jobs from any other
//! thread.
//!
//! - [`RunLoop`] is pumped by the thread that created it, from its own event loop.
//! - [`WorkerThread`] owns a dedicated thread that runs jobs as they arrive.

use crate::error::ExecutorError;
use std::marker::PhantomData;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Whether the calling thread is this executor's thread.
    fn is_current(&self) -> bool;

    /// Queue `job` to run on this executor's thread.
    fn execute(&self, job: Job) -> Result<(), ExecutorError>;
}

/// Job queue drained by the thread that created it.
///
/// The run loop stays on its thread; hand out [`RunLoopHandle`]s to other
/// threads and middleware.
pub struct RunLoop {
    handle: RunLoopHandle,
    jobs: Receiver<Job>,
    _not_send: PhantomData<*const ()>,
}

impl RunLoop {
    /// Create a run loop bound to the calling thread.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, jobs) = mpsc::channel();
        Self {
            handle: RunLoopHandle {
                name: Arc::from(name.into()),
                thread: thread::current().id(),
                tx,
            },
            jobs,
            _not_send: PhantomData,
        }
    }

    pub fn handle(&self) -> RunLoopHandle {
        self.handle.clone()
    }

    /// Run every job that is already queued. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.jobs.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one job and run it.
    pub fn run_once(&self, timeout: Duration) -> bool {
        match self.jobs.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Pump jobs until `done` returns true or `timeout` elapses.
    ///
    /// Returns whether `done` was satisfied.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.run_pending();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.run_once((deadline - now).min(Duration::from_millis(10)));
        }
    }
}

/// Cloneable, thread-safe side of a [`RunLoop`].
#[derive(Clone)]
pub struct RunLoopHandle {
    name: Arc<str>,
    thread: ThreadId,
    tx: Sender<Job>,
}

impl Executor for RunLoopHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        self.tx
            .send(job)
            .map_err(|_| ExecutorError::Closed(self.name.to_string()))
    }
}

/// Dedicated thread running jobs in arrival order.
///
/// The thread exits once every clone of the `WorkerThread` has been dropped
/// and the queue is empty.
#[derive(Clone)]
pub struct WorkerThread {
    name: Arc<str>,
    thread: ThreadId,
    tx: Sender<Job>,
}

impl WorkerThread {
    pub fn spawn(name: impl Into<String>) -> Result<(Self, JoinHandle<()>), ExecutorError> {
        let name = name.into();
        let (tx, jobs) = mpsc::channel::<Job>();

        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                log::debug!("WorkerThread '{}' started", thread_name);
                for job in jobs {
                    job();
                }
                log::debug!("WorkerThread '{}' stopped", thread_name);
            })
            .map_err(|e| ExecutorError::Spawn {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        let worker = Self {
            name: Arc::from(name),
            thread: handle.thread().id(),
            tx,
        };
        Ok((worker, handle))
    }
}

impl Executor for WorkerThread {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        self.tx
            .send(job)
            .map_err(|_| ExecutorError::Closed(self.name.to_string()))
    }
}
