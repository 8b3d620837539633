//! Schedulers: where submitted units of work actually run.
//!
//! Every asynchronous node of an [`Effect`](crate::Effect) carries a
//! [`Scheduler`]. Interpreting that node hands its registration function to
//! the scheduler as a unit of [`Work`]; the scheduler decides whether it runs
//! inline, on a fresh thread, or on a runtime's blocking pool.
//!
//! # Built-in schedulers
//!
//! - [`Immediate`] - runs work synchronously on the submitting thread
//! - [`ThreadScheduler`] - one named OS thread per unit of work
//! - `TokioScheduler` - a tokio runtime's blocking pool (feature `async`)
//!
//! # Failure reporting
//!
//! A panic inside submitted work never disappears. Schedulers catch it at the
//! work boundary and hand a [`WorkFailure`] to [`Scheduler::report_failure`],
//! which logs through `tracing` unless a custom hook is installed.
//!
//! ```rust
//! use undertow::scheduler::{immediate, Scheduler};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! let ran = Arc::new(AtomicBool::new(false));
//! let flag = ran.clone();
//! immediate().submit(Box::new(move || flag.store(true, Ordering::SeqCst)));
//! assert!(ran.load(Ordering::SeqCst));
//! ```

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

mod immediate;
#[cfg(feature = "async")]
mod runtime;
mod thread;

pub use immediate::{immediate, Immediate};
#[cfg(feature = "async")]
pub use runtime::TokioScheduler;
pub use thread::{ThreadScheduler, ThreadSchedulerBuilder};

pub(crate) use thread::sleeper;

/// A unit of work accepted by a [`Scheduler`].
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to a scheduler, as stored inside effect nodes.
pub type SchedulerRef = Arc<dyn Scheduler>;

/// Hook receiving failures that escaped submitted work.
pub type FailureHook = Arc<dyn Fn(WorkFailure) + Send + Sync>;

/// Accepts units of work and guarantees their eventual execution.
///
/// Implementations must be thread-safe: effects submit from whichever thread
/// currently drives them.
pub trait Scheduler: Send + Sync + 'static {
    /// Submit a unit of work. It runs exactly once, now or later.
    ///
    /// Work may run inline before `submit` returns, but `submit` must not
    /// wait for work running on another thread: a callback completed there
    /// waits for the submitting thread to park its continuations first.
    fn submit(&self, work: Work);

    /// Receive a failure (panic) that escaped a unit of submitted work.
    fn report_failure(&self, failure: WorkFailure) {
        log_failure(failure);
    }
}

/// A panic caught while running work submitted to a scheduler.
///
/// # Example
///
/// ```rust
/// use undertow::scheduler::WorkFailure;
///
/// let failure = WorkFailure::new("workers", "index out of bounds");
/// assert_eq!(failure.scheduler(), "workers");
/// assert_eq!(
///     failure.to_string(),
///     "work submitted to workers failed: index out of bounds"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkFailure {
    scheduler: String,
    message: String,
}

impl WorkFailure {
    /// Create a failure report for the named scheduler.
    pub fn new(scheduler: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scheduler: scheduler.into(),
            message: message.into(),
        }
    }

    pub(crate) fn from_panic(scheduler: &str, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(scheduler, message)
    }

    /// Name of the scheduler the work was submitted to.
    pub fn scheduler(&self) -> &str {
        &self.scheduler
    }

    /// The panic message, when it could be recovered from the payload.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for WorkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "work submitted to {} failed: {}",
            self.scheduler, self.message
        )
    }
}

impl std::error::Error for WorkFailure {}

/// The hook used when no other is configured: log at error level.
pub fn log_failure(failure: WorkFailure) {
    tracing::error!(
        scheduler = failure.scheduler(),
        message = failure.message(),
        "scheduled work panicked"
    );
}

pub(crate) fn default_hook() -> FailureHook {
    Arc::new(log_failure)
}

/// Run `work`, routing a panic to `report` instead of unwinding further.
pub(crate) fn run_guarded(scheduler: &str, work: Work, report: impl FnOnce(WorkFailure)) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
        report(WorkFailure::from_panic(scheduler, payload));
    }
}
