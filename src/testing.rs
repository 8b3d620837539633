//! Testing utilities and helpers for undertow
//!
//! This module provides ergonomic utilities for testing code built from
//! effects: assertion macros that interpret an effect and check its outcome,
//! a scheduler that records what was submitted to it, and property-based
//! testing support.
//!
//! # Examples
//!
//! ## Assertion Macros
//!
//! ```rust
//! use undertow::{assert_fails, assert_succeeds, Effect};
//!
//! let value = assert_succeeds!(Effect::<_, String>::succeed(42));
//! assert_eq!(value, 42);
//!
//! assert_fails!(Effect::<i32, _>::fail("error"), "error");
//! ```
//!
//! ## RecordingScheduler
//!
//! ```rust
//! use undertow::testing::RecordingScheduler;
//! use undertow::Effect;
//! use std::sync::Arc;
//!
//! let scheduler = Arc::new(RecordingScheduler::new());
//! let effect = Effect::<_, String>::delay(|| 1).eval_on(scheduler.clone());
//!
//! assert_eq!(effect.run_blocking(), Ok(1));
//! assert_eq!(scheduler.submitted(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::scheduler::{run_guarded, Scheduler, Work, WorkFailure};

/// An inline scheduler that records submissions and reported failures.
///
/// Work runs synchronously on the submitting thread, exactly like
/// [`Immediate`](crate::scheduler::Immediate), so tests stay deterministic.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    submitted: AtomicUsize,
    failures: Mutex<Vec<WorkFailure>>,
}

impl RecordingScheduler {
    /// Create a scheduler with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of units of work submitted so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Failures reported so far, oldest first.
    pub fn failures(&self) -> Vec<WorkFailure> {
        self.failures.lock().clone()
    }
}

impl Scheduler for RecordingScheduler {
    fn submit(&self, work: Work) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        run_guarded("recording", work, |failure| self.report_failure(failure));
    }

    fn report_failure(&self, failure: WorkFailure) {
        self.failures.lock().push(failure);
    }
}

/// Interpret an effect and assert that it succeeds.
///
/// Evaluates to the success value. With a second argument, also asserts the
/// value equals it.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_succeeds, Effect};
///
/// assert_succeeds!(Effect::<_, String>::succeed(1).map(|x| x + 1), 2);
/// ```
#[macro_export]
macro_rules! assert_succeeds {
    ($effect:expr) => {
        match $crate::Effect::run_blocking($effect) {
            Ok(value) => value,
            Err(e) => {
                panic!("Expected success, got failure: {:?}", e);
            }
        }
    };
    ($effect:expr, $expected:expr) => {
        match $crate::Effect::run_blocking($effect) {
            Ok(value) => assert_eq!(value, $expected),
            Err(e) => {
                panic!("Expected success {:?}, got failure: {:?}", $expected, e);
            }
        }
    };
}

/// Interpret an effect and assert that it fails.
///
/// Evaluates to the error. With a second argument, also asserts the error
/// equals it.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_fails, Effect};
///
/// let error = assert_fails!(Effect::<i32, _>::fail("nope".to_string()));
/// assert_eq!(error, "nope");
/// ```
#[macro_export]
macro_rules! assert_fails {
    ($effect:expr) => {
        match $crate::Effect::run_blocking($effect) {
            Err(error) => error,
            Ok(v) => {
                panic!("Expected failure, got success: {:?}", v);
            }
        }
    };
    ($effect:expr, $expected:expr) => {
        match $crate::Effect::run_blocking($effect) {
            Err(error) => assert_eq!(error, $expected),
            Ok(v) => {
                panic!("Expected failure {:?}, got success: {:?}", $expected, v);
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<A, E> Arbitrary for crate::Effect<A, E>
where
    A: Arbitrary + Clone + Send + Sync + 'static,
    E: Arbitrary + Clone + Send + Sync + 'static,
    A::Parameters: Clone,
{
    type Parameters = (A::Parameters, E::Parameters);
    type Strategy = BoxedStrategy<Self>;

    /// Pure successes and failures, plus successes that cross an
    /// (immediate) async boundary.
    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let (a_params, e_params) = args;
        prop_oneof![
            any_with::<A>(a_params.clone()).prop_map(crate::Effect::<A, E>::succeed),
            any_with::<E>(e_params).prop_map(crate::Effect::<A, E>::fail),
            any_with::<A>(a_params).prop_map(|a| {
                crate::Effect::<A, E>::async_on(crate::scheduler::immediate(), move |callback| {
                    callback.succeed(a.clone())
                })
            }),
        ]
        .boxed()
    }
}
