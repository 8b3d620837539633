//! Write-once cells with a one-shot gate.
//!
//! A [`Promise`] bridges push-style completion (somebody calls
//! [`complete`](Promise::complete) once) into pull-style reads (any number of
//! readers block in [`wait`](Promise::wait), or register a subscriber).
//!
//! # Ordering
//!
//! The value is stored before the gate is opened and readers only ever see
//! the value through the same lock the completer takes to open the gate, so a
//! woken reader always observes the written value.
//!
//! # Example
//!
//! ```rust
//! use undertow::Promise;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let promise = Arc::new(Promise::new());
//! let writer = Arc::clone(&promise);
//! thread::spawn(move || writer.complete("ready").unwrap());
//!
//! assert_eq!(*promise.wait(), "ready");
//! assert!(promise.complete("again").is_err());
//! ```

use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

type Subscriber<T> = Box<dyn FnOnce(&T) + Send>;

/// A write-once slot paired with a gate for blocking readers.
pub struct Promise<T> {
    value: OnceLock<T>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
    opened: Condvar,
}

/// Returned by [`Promise::complete`] when the promise already holds a value.
///
/// Carries the rejected value back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyCompleted<T>(pub T);

impl<T> AlreadyCompleted<T> {
    /// Recover the value that was not written.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Display for AlreadyCompleted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "promise already completed")
    }
}

impl<T: fmt::Debug> std::error::Error for AlreadyCompleted<T> {}

impl<T> Promise<T> {
    /// Create an empty promise.
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
            subscribers: Mutex::new(Vec::new()),
            opened: Condvar::new(),
        }
    }

    /// Write the value, open the gate, and notify subscribers.
    ///
    /// Only the first call succeeds; later calls hand their value back.
    ///
    /// # Panics
    ///
    /// Subscribers run on the calling thread, in subscription order. Every
    /// subscriber runs even if an earlier one panics; the first panic is then
    /// re-raised once all of them have been notified.
    pub fn complete(&self, value: T) -> Result<(), AlreadyCompleted<T>> {
        self.value.set(value).map_err(AlreadyCompleted)?;

        let subscribers = std::mem::take(&mut *self.subscribers.lock());
        self.opened.notify_all();

        if let Some(value) = self.value.get() {
            let mut first_panic = None;
            for subscriber in subscribers {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| subscriber(value))) {
                    first_panic.get_or_insert(panic);
                }
            }
            if let Some(panic) = first_panic {
                tracing::debug!("promise subscriber panicked");
                resume_unwind(panic);
            }
        }
        Ok(())
    }

    /// The value, if the promise has been completed.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Whether the promise has been completed.
    pub fn is_completed(&self) -> bool {
        self.value.get().is_some()
    }

    /// Block until the promise is completed.
    ///
    /// Blocks forever if nobody ever completes it.
    pub fn wait(&self) -> &T {
        let mut gate = self.subscribers.lock();
        loop {
            if let Some(value) = self.value.get() {
                return value;
            }
            self.opened.wait(&mut gate);
        }
    }

    /// Block until the promise is completed or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<&T> {
        let deadline = Instant::now() + timeout;
        let mut gate = self.subscribers.lock();
        loop {
            if let Some(value) = self.value.get() {
                return Some(value);
            }
            if self.opened.wait_until(&mut gate, deadline).timed_out() {
                return self.value.get();
            }
        }
    }

    /// Run `f` with the value once it is available.
    ///
    /// Runs immediately, on the calling thread, when already completed;
    /// otherwise on the thread that completes the promise.
    pub fn subscribe<F>(&self, f: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let mut subscribers = self.subscribers.lock();
        match self.value.get() {
            Some(value) => {
                drop(subscribers);
                f(value);
            }
            None => subscribers.push(Box::new(f)),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_second_write_is_rejected() {
        let promise = Promise::new();
        assert_eq!(promise.complete(1), Ok(()));
        assert_eq!(promise.complete(2), Err(AlreadyCompleted(2)));
        assert_eq!(promise.get(), Some(&1));
    }

    #[test]
    fn test_wait_timeout_on_empty_promise() {
        let promise = Promise::<i32>::new();
        assert_eq!(promise.wait_timeout(Duration::from_millis(20)), None);
        assert!(!promise.is_completed());
    }

    #[test]
    fn test_many_readers_see_the_same_value() {
        let promise = Arc::new(Promise::new());
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let promise = Arc::clone(&promise);
                thread::spawn(move || *promise.wait())
            })
            .collect();

        promise.complete(99).unwrap();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 99);
        }
    }

    #[test]
    fn test_subscribers_before_and_after_completion() {
        let promise = Promise::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let early = Arc::clone(&hits);
        promise.subscribe(move |v: &usize| {
            early.fetch_add(*v, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        promise.complete(10).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 10);

        let late = Arc::clone(&hits);
        promise.subscribe(move |v: &usize| {
            late.fetch_add(*v, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_subscriber_may_reenter_promise() {
        let promise = Arc::new(Promise::new());
        let inner = Arc::clone(&promise);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);

        promise.subscribe(move |_: &usize| {
            inner.subscribe(move |v| {
                sink.store(*v, Ordering::SeqCst);
            });
        });
        promise.complete(5).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_panicking_subscriber_does_not_skip_the_rest() {
        let promise = Promise::new();
        let seen = Arc::new(AtomicUsize::new(0));

        promise.subscribe(|_: &usize| panic!("first subscriber failed"));
        let sink = Arc::clone(&seen);
        promise.subscribe(move |v: &usize| {
            sink.store(*v, Ordering::SeqCst);
        });

        let completed = catch_unwind(AssertUnwindSafe(|| promise.complete(3)));

        let payload = completed.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"first subscriber failed"));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(promise.get(), Some(&3));
    }
}
