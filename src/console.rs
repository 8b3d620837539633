//! Small console effects.
//!
//! Handy in demos and tests for watching where and in which order parts of
//! a composed effect actually run.
//!
//! ```rust
//! use undertow::console::{print_line, thread_name};
//! use undertow::Effect;
//!
//! let effect = print_line::<String>("hello")
//!     .product_r(thread_name())
//!     .map(|name| name.len() > 0);
//! assert_eq!(effect.run_blocking(), Ok(true));
//! ```

use std::thread;

use crate::Effect;

/// Print `line` to stdout each time the effect is interpreted.
pub fn print_line<E: Send + 'static>(line: impl Into<String>) -> Effect<(), E> {
    let line = line.into();
    Effect::delay(move || println!("{}", line))
}

/// The name of the thread interpreting the effect, or `"<unnamed>"`.
pub fn thread_name<E: Send + 'static>() -> Effect<String, E> {
    Effect::delay(|| thread::current().name().unwrap_or("<unnamed>").to_string())
}
