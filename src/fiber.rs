//! Handles to running computations.
//!
//! A [`Fiber`] is the shared, cached outcome of an effect that was started
//! eagerly. It is backed by a [`Promise`]: the computation writes its
//! outcome once, and any number of joiners read that same outcome, whether
//! they arrive before or after it is written.
//!
//! # Example
//!
//! ```rust
//! use undertow::scheduler::ThreadScheduler;
//! use undertow::Effect;
//! use std::sync::Arc;
//!
//! let fiber = Effect::<_, String>::delay(|| 6 * 7).run_fiber(Arc::new(ThreadScheduler::new()));
//! assert_eq!(fiber.wait(), Ok(42));
//! assert_eq!(fiber.join().run_blocking(), Ok(42));
//! ```

use std::fmt;
use std::panic::resume_unwind;
use std::sync::Arc;
use std::time::Duration;

use crate::callback::Callback;
use crate::effect::node::Next;
use crate::effect::Effect;
use crate::promise::{AlreadyCompleted, Promise};
use crate::scheduler::{immediate, WorkFailure};

#[derive(Clone)]
enum Slot<A, E> {
    Outcome(Result<A, E>),
    Panicked(WorkFailure),
}

impl<A, E> Slot<A, E> {
    /// The recorded outcome; re-raises a recorded panic.
    fn outcome(&self) -> &Result<A, E> {
        match self {
            Slot::Outcome(outcome) => outcome,
            Slot::Panicked(failure) => resume_unwind(Box::new(failure.message().to_string())),
        }
    }
}

/// The eventual outcome of a started computation.
///
/// Cloning a fiber shares the same outcome slot. A computation that panicked
/// leaves a panic marker instead of an outcome; every read of the outcome,
/// blocking or joined, re-raises that panic on the reading thread.
pub struct Fiber<A, E> {
    promise: Arc<Promise<Slot<A, E>>>,
}

impl<A, E> Clone for Fiber<A, E> {
    fn clone(&self) -> Self {
        Self {
            promise: Arc::clone(&self.promise),
        }
    }
}

impl<A, E> Fiber<A, E> {
    /// A fiber with no outcome yet.
    pub fn pending() -> Self {
        Self {
            promise: Arc::new(Promise::new()),
        }
    }

    /// A fiber that already holds `outcome`.
    pub fn completed(outcome: Result<A, E>) -> Self {
        let fiber = Self::pending();
        // A fresh promise accepts its first write.
        let _ = fiber.promise.complete(Slot::Outcome(outcome));
        fiber
    }

    /// Record the outcome. Only the first call has any effect.
    ///
    /// Waiting joiners resume on the calling thread. If one of them panics,
    /// the others still resume and the first panic is re-raised afterwards.
    pub fn complete(&self, outcome: Result<A, E>) -> Result<(), AlreadyCompleted<Result<A, E>>> {
        match self.promise.complete(Slot::Outcome(outcome)) {
            Ok(()) => Ok(()),
            Err(AlreadyCompleted(Slot::Outcome(outcome))) => Err(AlreadyCompleted(outcome)),
            Err(AlreadyCompleted(Slot::Panicked(_))) => {
                unreachable!("complete only writes outcomes")
            }
        }
    }

    /// Record that the computation panicked. Ignored once an outcome exists.
    pub(crate) fn abort(&self, failure: WorkFailure) {
        let _ = self.promise.complete(Slot::Panicked(failure));
    }

    /// Whether the outcome, or a panic, has been recorded.
    pub fn is_completed(&self) -> bool {
        self.promise.is_completed()
    }

    /// The recorded panic, if the computation panicked.
    pub fn panicked(&self) -> Option<&WorkFailure> {
        match self.promise.get() {
            Some(Slot::Panicked(failure)) => Some(failure),
            _ => None,
        }
    }

    /// Borrow the outcome if it has been recorded.
    ///
    /// # Panics
    ///
    /// Re-raises the panic of a computation that panicked.
    pub fn outcome(&self) -> Option<&Result<A, E>> {
        self.promise.get().map(Slot::outcome)
    }
}

impl<A, E> Fiber<A, E>
where
    A: Clone,
    E: Clone,
{
    /// A copy of the outcome if it has been recorded.
    pub fn try_result(&self) -> Option<Result<A, E>> {
        self.outcome().cloned()
    }

    /// Block the calling thread until the outcome is recorded.
    pub fn wait(&self) -> Result<A, E> {
        self.promise.wait().outcome().clone()
    }

    /// Block for at most `timeout`; `None` when the outcome is still missing.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<A, E>> {
        self.promise
            .wait_timeout(timeout)
            .map(|slot| slot.outcome().clone())
    }

    /// Deliver a copy of the outcome to `callback` once it is recorded.
    ///
    /// A recorded panic is re-raised on the delivering thread instead.
    pub fn subscribe(&self, callback: Callback<A, E>)
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        self.promise
            .subscribe(move |slot: &Slot<A, E>| callback.complete(slot.outcome().clone()));
    }
}

impl<A, E> Fiber<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// An effect that waits for this fiber and yields its outcome.
    ///
    /// Joining never re-runs the computation; every join, concurrent or
    /// not, observes the one recorded outcome. Joining a panicked fiber
    /// panics inside the joining effect.
    pub fn join(&self) -> Effect<A, E> {
        let fiber = self.clone();
        Effect::<Slot<A, E>, E>::async_on(immediate(), move |callback| {
            fiber
                .promise
                .subscribe(move |slot: &Slot<A, E>| callback.succeed(slot.clone()))
        })
        .bind(|slot: Slot<A, E>| Next::done(slot.outcome().clone()))
    }
}

impl<A: fmt::Debug, E: fmt::Debug> fmt::Debug for Fiber<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Fiber");
        match self.promise.get() {
            Some(Slot::Panicked(failure)) => out.field("panicked", &failure.message()),
            Some(Slot::Outcome(outcome)) => out.field("outcome", &Some(outcome)),
            None => out.field("outcome", &None::<&Result<A, E>>),
        };
        out.finish()
    }
}
