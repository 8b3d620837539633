//! Deferred, composable effects.
//!
//! An [`Effect<A, E>`] is an immutable description of a computation that
//! produces an `A` or fails with an `E`. Building and combining effects runs
//! nothing; an effect only executes when it is interpreted through one of the
//! `run_*` methods.
//!
//! # Core Concepts
//!
//! - **Closed algebra**: every effect is a thunk, an async registration bound
//!   to a [`Scheduler`](crate::scheduler::Scheduler), a `flat_map`, or an
//!   `attempt`. Every other combinator is built from those four.
//! - **Reusable descriptions**: effects are cheap to clone and may be
//!   interpreted any number of times. Each interpretation runs the described
//!   side effects again.
//! - **Fail-fast sequencing**: in `a.flat_map(f)`, `f` never runs when `a`
//!   fails; the failure propagates untouched.
//! - **Stack safety**: the interpreter keeps pending continuations on an
//!   explicit stack, so arbitrarily long synchronous chains run in bounded
//!   native stack.
//!
//! # Examples
//!
//! ## Sequencing
//!
//! ```
//! use undertow::Effect;
//!
//! let effect = Effect::<_, String>::succeed(1).flat_map(|x| Effect::succeed(x + 1));
//! assert_eq!(effect.run_blocking(), Ok(2));
//! ```
//!
//! ## Reifying failure
//!
//! ```
//! use undertow::Effect;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Boom;
//!
//! let effect = Effect::<i32, _>::fail(Boom).attempt();
//! assert_eq!(effect.run_blocking(), Ok(Err(Boom)));
//! ```
//!
//! ## Running concurrently
//!
//! ```
//! use undertow::scheduler::ThreadScheduler;
//! use undertow::Effect;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let workers = Arc::new(ThreadScheduler::new());
//! let slow = |n| Effect::<(), String>::sleep(Duration::from_millis(100)).as_value(n);
//!
//! // Both sleeps overlap: this takes about 100ms, not 200ms.
//! let sum = slow(1).concurrent_map2(slow(2), workers, |a, b| a + b);
//! assert_eq!(sum.run_blocking(), Ok(3));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::callback::Callback;
use crate::fiber::Fiber;
use crate::scheduler::{immediate, sleeper, SchedulerRef};

pub mod constructors;
mod ext;
mod instrument;
mod interpret;
pub(crate) mod node;
mod parallel;
mod retry;
mod run;

pub use constructors::{delay, effect, fail, from_fiber, from_result, never, sleep, succeed, unit};
pub use parallel::{concurrent_sequence, concurrent_traverse};

use node::{erase, Node, Step, Value};

/// A deferred computation producing `A` or failing with `E`.
///
/// `Effect` is a handle to an immutable tree; cloning it is a reference-count
/// bump and does not duplicate or run anything.
///
/// # Type Parameters
///
/// * `A` - The type of the success value
/// * `E` - The type of the error value (defaults to `std::convert::Infallible`)
pub struct Effect<A, E = Infallible> {
    node: Node,
    _marker: PhantomData<fn() -> Result<A, E>>,
}

impl<A, E> Clone for Effect<A, E> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            _marker: PhantomData,
        }
    }
}

impl<A, E> fmt::Debug for Effect<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("step", &self.node.kind())
            .finish()
    }
}

impl<A, E> Effect<A, E> {
    pub(crate) fn from_step(step: Step) -> Self {
        Self::from_node(Arc::new(step))
    }

    pub(crate) fn from_node(node: Node) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_node(self) -> Node {
        self.node
    }
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// An effect that always succeeds with `value`.
    ///
    /// The value is cloned on every interpretation.
    ///
    /// ```
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<_, String>::succeed(42);
    /// assert_eq!(effect.run_blocking(), Ok(42));
    /// ```
    pub fn succeed(value: A) -> Self
    where
        A: Clone + Sync,
    {
        Self::from_step(Step::Thunk(Box::new(move || Ok(Box::new(value.clone()) as Value))))
    }

    /// An effect that always fails with `error`.
    ///
    /// ```
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<i32, _>::fail("error");
    /// assert_eq!(effect.run_blocking(), Err("error"));
    /// ```
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::from_step(Step::Thunk(Box::new(move || Err(Box::new(error.clone()) as Value))))
    }

    /// An effect that settles with a copy of `result`.
    pub fn from_result(result: Result<A, E>) -> Self
    where
        A: Clone + Sync,
        E: Clone + Sync,
    {
        Self::from_step(Step::Thunk(Box::new(move || erase(result.clone()))))
    }

    /// Wrap a side-effecting, possibly failing computation.
    ///
    /// `f` runs synchronously on whichever thread interprets the effect, once
    /// per interpretation. An `Err` it returns becomes the effect's failure.
    ///
    /// ```
    /// use undertow::Effect;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let counter = calls.clone();
    /// let effect = Effect::<_, String>::from_fn(move || Ok(counter.fetch_add(1, Ordering::SeqCst)));
    ///
    /// assert_eq!(calls.load(Ordering::SeqCst), 0); // nothing ran yet
    /// assert_eq!(effect.clone().run_blocking(), Ok(0));
    /// assert_eq!(effect.run_blocking(), Ok(1));
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Result<A, E> + Send + Sync + 'static,
    {
        Self::from_step(Step::Thunk(Box::new(move || erase(f()))))
    }

    /// Wrap a side-effecting computation that cannot fail.
    pub fn delay<F>(f: F) -> Self
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        Self::from_step(Step::Thunk(Box::new(move || Ok(Box::new(f()) as Value))))
    }

    /// An asynchronous effect.
    ///
    /// Interpreting it submits `register` to `scheduler`. `register` receives
    /// the effect's [`Callback`] and is responsible for completing it, from
    /// any thread, at any later time, or never. It must not block waiting on
    /// another thread that completes the callback: continuations only move to
    /// that thread after the scheduler's `submit` has returned.
    ///
    /// ```
    /// use undertow::scheduler::ThreadScheduler;
    /// use undertow::Effect;
    /// use std::sync::Arc;
    ///
    /// let effect = Effect::<_, String>::async_on(Arc::new(ThreadScheduler::new()), |callback| {
    ///     callback.succeed(std::thread::current().name().map(str::to_string))
    /// });
    /// assert_eq!(effect.run_blocking(), Ok(Some("undertow-worker-0".to_string())));
    /// ```
    pub fn async_on<F>(scheduler: SchedulerRef, register: F) -> Self
    where
        F: Fn(Callback<A, E>) + Send + Sync + 'static,
    {
        Self::from_step(Step::Async {
            register: Arc::new(move |sink| {
                register(Callback::new(move |result| sink(erase(result))))
            }),
            scheduler,
        })
    }

    /// An effect that never completes.
    ///
    /// Its registration drops the callback without calling it. Joining or
    /// blocking on it waits forever.
    pub fn never() -> Self {
        Self::async_on(immediate(), |_callback| {})
    }

    /// Bridge an already-running [`Fiber`] into an effect.
    ///
    /// Interpreting the effect subscribes to the fiber and forwards its
    /// outcome; it does not run anything again.
    ///
    /// ```
    /// use undertow::{Effect, Fiber};
    ///
    /// let fiber = Fiber::<_, String>::completed(Ok(5));
    /// assert_eq!(Effect::from_fiber(&fiber).run_blocking(), Ok(5));
    /// ```
    pub fn from_fiber(fiber: &Fiber<A, E>) -> Self
    where
        A: Clone + Sync,
        E: Clone + Sync,
    {
        fiber.join()
    }
}

impl<E: Send + 'static> Effect<(), E> {
    /// An effect that succeeds with `()`.
    pub fn unit() -> Self {
        Self::from_step(Step::Thunk(Box::new(|| Ok(Box::new(()) as Value))))
    }

    /// Wait for `duration` without blocking the interpreting thread.
    ///
    /// The wait happens on a dedicated sleeper thread; whatever follows the
    /// sleep continues on that thread.
    pub fn sleep(duration: Duration) -> Self {
        Self::async_on(sleeper(), move |callback| {
            thread::sleep(duration);
            callback.succeed(());
        })
    }
}
