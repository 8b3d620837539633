//! One-shot completion sinks.
//!
//! A [`Callback`] is how an effect reports its outcome: exactly one
//! `Result<A, E>`, delivered once. The at-most-once half of that contract is
//! enforced by ownership, since every completing method consumes the callback.
//!
//! # Example
//!
//! ```rust
//! use undertow::{Callback, Effect};
//! use std::sync::mpsc;
//!
//! let (tx, rx) = mpsc::channel();
//! Effect::<_, String>::succeed(7).run_with(Callback::new(move |outcome| {
//!     tx.send(outcome).unwrap();
//! }));
//! assert_eq!(rx.recv().unwrap(), Ok(7));
//! ```

use std::fmt;

/// A one-shot sink for a success-or-failure outcome.
pub struct Callback<A, E> {
    sink: Box<dyn FnOnce(Result<A, E>) + Send>,
}

impl<A, E> Callback<A, E> {
    /// Wrap a closure as a callback.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Result<A, E>) + Send + 'static,
    {
        Self { sink: Box::new(f) }
    }

    /// Deliver an outcome.
    pub fn complete(self, outcome: Result<A, E>) {
        (self.sink)(outcome)
    }

    /// Deliver a success value.
    pub fn succeed(self, value: A) {
        self.complete(Ok(value))
    }

    /// Deliver a failure.
    pub fn fail(self, error: E) {
        self.complete(Err(error))
    }
}

impl<A, E> fmt::Debug for Callback<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("sink", &"<function>")
            .finish()
    }
}
