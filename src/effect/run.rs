//! Interpreting effects.
//!
//! Every entry point ends in the same interpreter; they differ only in how
//! the outcome is handed back:
//!
//! - [`run_with`](Effect::run_with) - to a callback, from whichever thread completes it
//! - [`run_blocking`](Effect::run_blocking) - by blocking the calling thread
//! - [`run_fiber`](Effect::run_fiber) - through a fiber, running on a scheduler
//! - [`run_async`](Effect::run_async) - through a future
//!
//! A panic inside the effect is not an outcome. Each entry point re-raises
//! it where the outcome would have been delivered, except `run_fiber`, which
//! reports it to the scheduler and marks the fiber as panicked.

use std::future::Future;
use std::panic::resume_unwind;
use std::sync::{mpsc, Arc};
use std::thread;

use futures::channel::oneshot;

use super::interpret::interpret;
use super::node::{restore, Exit};
use super::Effect;
use crate::callback::Callback;
use crate::fiber::Fiber;
use crate::scheduler::{SchedulerRef, WorkFailure};

fn conclude<A: 'static, E: 'static>(exit: Exit) -> thread::Result<Result<A, E>> {
    match exit {
        Exit::Settled(outcome) => Ok(restore(outcome)),
        Exit::Panicked(panic) => Err(panic),
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Interpret the effect, delivering the outcome to `callback`.
    ///
    /// Synchronous steps run on the calling thread before this returns.
    /// After the first async boundary the remainder runs on whichever thread
    /// completes that boundary, and so does `callback`.
    ///
    /// # Panics
    ///
    /// A panic inside the effect is re-raised on that same thread instead of
    /// calling `callback`.
    pub fn run_with(self, callback: Callback<A, E>) {
        interpret(
            self.into_node(),
            Box::new(move |exit| match conclude::<A, E>(exit) {
                Ok(outcome) => callback.complete(outcome),
                Err(panic) => resume_unwind(panic),
            }),
        );
    }

    /// Interpret the effect and block the calling thread for its outcome.
    ///
    /// A failure comes back as `Err`. An effect that never completes, such
    /// as [`Effect::never`], blocks forever.
    ///
    /// Do not call this from inside an async runtime's worker; use
    /// [`run_async`](Effect::run_async) there.
    ///
    /// # Panics
    ///
    /// Re-raises, on the calling thread, a panic from anywhere inside the
    /// effect, including forked computations it joins.
    pub fn run_blocking(self) -> Result<A, E> {
        let (tx, rx) = mpsc::sync_channel(1);
        interpret(
            self.into_node(),
            Box::new(move |exit| {
                // The receiver outlives this send: it is blocked on it below.
                let _ = tx.send(conclude::<A, E>(exit));
            }),
        );

        match rx.recv() {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(panic)) => resume_unwind(panic),
            Err(_) => {
                tracing::warn!("effect dropped its callback without completing; blocking forever");
                loop {
                    thread::park();
                }
            }
        }
    }

    /// Interpret the effect on `scheduler`, returning a handle to its outcome.
    ///
    /// Submission happens before this returns; the computation itself runs
    /// whenever the scheduler gets to it.
    ///
    /// If the computation panics, the panic is handed to
    /// [`Scheduler::report_failure`](crate::scheduler::Scheduler::report_failure)
    /// and the fiber is marked as panicked, so joiners re-raise it instead
    /// of waiting forever.
    pub fn run_fiber(self, scheduler: SchedulerRef) -> Fiber<A, E>
    where
        A: Clone + Sync,
        E: Clone + Sync,
    {
        let fiber = Fiber::pending();
        let completer = fiber.clone();
        let reporter = Arc::clone(&scheduler);
        let node = self.into_node();
        scheduler.submit(Box::new(move || {
            interpret(
                node,
                Box::new(move |exit| match conclude::<A, E>(exit) {
                    // The fiber is private to this run, so this is its only write.
                    Ok(outcome) => {
                        let _ = completer.complete(outcome);
                    }
                    Err(panic) => {
                        let failure = WorkFailure::from_panic("fiber", panic);
                        tracing::debug!(message = failure.message(), "forked effect panicked");
                        reporter.report_failure(failure.clone());
                        completer.abort(failure);
                    }
                }),
            );
        }));
        fiber
    }

    /// Interpret the effect when the returned future is first polled.
    ///
    /// Synchronous steps run inside that first poll. An effect that never
    /// completes yields a future that stays pending. A panic inside the effect
    /// is re-raised from `poll`.
    ///
    /// ```
    /// use undertow::Effect;
    ///
    /// # tokio_test::block_on(async {
    /// let effect = Effect::<_, String>::succeed(20).map(|x| x + 1);
    /// assert_eq!(effect.run_async().await, Ok(21));
    /// # });
    /// ```
    pub fn run_async(self) -> impl Future<Output = Result<A, E>> + Send {
        async move {
            let (tx, rx) = oneshot::channel();
            interpret(
                self.into_node(),
                Box::new(move |exit| {
                    let _ = tx.send(conclude::<A, E>(exit));
                }),
            );

            match rx.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(panic)) => resume_unwind(panic),
                Err(oneshot::Canceled) => {
                    tracing::warn!("effect dropped its callback without completing; pending forever");
                    futures::future::pending().await
                }
            }
        }
    }
}
