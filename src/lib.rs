//! # Undertow
//!
//! > *"What moves beneath the surface"*
//!
//! A small effect system: describe computations as values, compose them, and
//! choose where and when they run.
//!
//! ## Overview
//!
//! - [`Effect`] - an immutable, reusable description of a computation that
//!   produces an `A` or fails with an `E`. Four node kinds (thunk, async,
//!   flat_map, attempt) are interpreted by a stack-safe trampoline.
//! - [`Callback`] - the one-shot sink every outcome is delivered to.
//! - [`scheduler`] - where asynchronous work runs: inline, on fresh threads,
//!   or on a tokio runtime (feature `async`).
//! - [`Fiber`] and [`Promise`] - eagerly started computations and the
//!   write-once cell behind them.
//! - Concurrency (`start`, `eval_on`, `concurrent_map2`,
//!   [`concurrent_traverse`](effect::concurrent_traverse)), retries
//!   (`retry_once`, `retry_until_success`) and sequencing
//!   ([`traverse`](traverse::traverse), [`sequence`](traverse::sequence)).
//!
//! ## Quick Example
//!
//! ```rust
//! use undertow::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn fetch(id: u32) -> Effect<String, String> {
//!     Effect::sleep(Duration::from_millis(20)).map(move |_| format!("user-{}", id))
//! }
//!
//! let workers = Arc::new(ThreadScheduler::new());
//! let users = concurrent_traverse(vec![1, 2, 3], workers, fetch)
//!     .map(|names| names.join(","))
//!     .retry_once();
//!
//! assert_eq!(users.run_blocking(), Ok("user-1,user-2,user-3".to_string()));
//! ```
//!
//! Nothing runs until `run_blocking` (or `run_with`, `run_fiber`,
//! `run_async`) interprets the effect.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod callback;
pub mod console;
pub mod effect;
pub mod fiber;
pub mod promise;
pub mod scheduler;
pub mod testing;
pub mod traverse;

// Re-exports
pub use callback::Callback;
pub use effect::Effect;
pub use fiber::Fiber;
pub use promise::{AlreadyCompleted, Promise};
pub use scheduler::{Scheduler, SchedulerRef, WorkFailure};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::callback::Callback;
    pub use crate::effect::{concurrent_sequence, concurrent_traverse, Effect};
    pub use crate::fiber::Fiber;
    pub use crate::promise::Promise;
    pub use crate::scheduler::{immediate, Scheduler, SchedulerRef, ThreadScheduler};
    pub use crate::traverse::{sequence, traverse};
}
