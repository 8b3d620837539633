//! Scheduler backed by a tokio runtime (feature `async`).

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::{default_hook, run_guarded, FailureHook, Scheduler, Work, WorkFailure};

/// Runs submitted work on a tokio runtime's blocking pool.
///
/// Work goes through [`Handle::spawn_blocking`] because registration
/// functions are ordinary synchronous closures and may block.
///
/// # Example
///
/// ```rust
/// use undertow::scheduler::TokioScheduler;
/// use undertow::Effect;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let scheduler = Arc::new(TokioScheduler::current());
///     let answer = Effect::<_, String>::delay(|| 42).eval_on(scheduler).run_async().await;
///     assert_eq!(answer, Ok(42));
/// }
/// ```
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
    on_failure: FailureHook,
}

impl TokioScheduler {
    /// Schedule onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            on_failure: default_hook(),
        }
    }

    /// Schedule onto the runtime the caller is running inside.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Replace the default (logging) failure hook.
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(WorkFailure) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(hook);
        self
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("handle", &self.handle)
            .field("on_failure", &"<hook>")
            .finish()
    }
}

impl Scheduler for TokioScheduler {
    fn submit(&self, work: Work) {
        let hook = Arc::clone(&self.on_failure);
        drop(
            self.handle
                .spawn_blocking(move || run_guarded("tokio", work, |failure| hook(failure))),
        );
    }

    fn report_failure(&self, failure: WorkFailure) {
        (self.on_failure)(failure);
    }
}
