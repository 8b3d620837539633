//! Retry combinators.
//!
//! Both are plain recovery: they are built from
//! [`handle_error_with`](Effect::handle_error_with) and re-interpret the same
//! effect description, so every retry runs its side effects again.
//!
//! There is no attempt limit and no backoff growth. An effect that always
//! fails keeps `retry_until_success` running forever.

use std::time::Duration;

use super::Effect;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// On failure, run `self` exactly once more.
    ///
    /// A second failure propagates.
    ///
    /// ```
    /// use undertow::Effect;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// let calls = Arc::new(AtomicU32::new(0));
    /// let counter = calls.clone();
    /// let flaky = Effect::from_fn(move || match counter.fetch_add(1, Ordering::SeqCst) {
    ///     0 => Err("first call fails"),
    ///     n => Ok(n),
    /// });
    ///
    /// assert_eq!(flaky.retry_once().run_blocking(), Ok(1));
    /// assert_eq!(calls.load(Ordering::SeqCst), 2);
    /// ```
    pub fn retry_once(self) -> Effect<A, E> {
        let again = self.clone();
        self.handle_error_with(move |_| {
            tracing::debug!("effect failed, retrying once");
            again.clone()
        })
    }

    /// On failure, wait `delay` and try again, until an attempt succeeds.
    ///
    /// The wait is an asynchronous [`sleep`](Effect::sleep), so the retry
    /// resumes on the sleeper thread rather than blocking the caller.
    pub fn retry_until_success(self, delay: Duration) -> Effect<A, E> {
        let again = self.clone();
        self.handle_error_with(move |_| {
            tracing::debug!(?delay, "effect failed, retrying");
            Effect::sleep(delay).product_r(again.clone().retry_until_success(delay))
        })
    }
}
