//! Constructor functions for creating effects.
//!
//! Free-function spellings of the `Effect::*` constructors, for call sites
//! where the types are already pinned down by context.

use std::time::Duration;

use crate::effect::Effect;
use crate::fiber::Fiber;

/// Create an effect that succeeds with the given value.
///
/// # Example
///
/// ```rust
/// use undertow::effect::succeed;
///
/// let effect = succeed::<_, String>(42);
/// assert_eq!(effect.run_blocking(), Ok(42));
/// ```
pub fn succeed<A, E>(value: A) -> Effect<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    Effect::succeed(value)
}

/// Create an effect that fails with the given error.
///
/// # Example
///
/// ```rust
/// use undertow::effect::fail;
///
/// let effect = fail::<i32, _>("error".to_string());
/// assert_eq!(effect.run_blocking(), Err("error".to_string()));
/// ```
pub fn fail<A, E>(error: E) -> Effect<A, E>
where
    A: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    Effect::fail(error)
}

/// Create an effect from a `Result`.
pub fn from_result<A, E>(result: Result<A, E>) -> Effect<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Effect::from_result(result)
}

/// Create an effect from a side-effecting, possibly failing function.
///
/// # Example
///
/// ```rust
/// use undertow::effect::effect;
///
/// let parse = effect(|| "17".parse::<u8>());
/// assert_eq!(parse.run_blocking(), Ok(17));
/// ```
pub fn effect<A, E, F>(f: F) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Result<A, E> + Send + Sync + 'static,
{
    Effect::from_fn(f)
}

/// Create an effect from a side-effecting function that cannot fail.
pub fn delay<A, E, F>(f: F) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    Effect::delay(f)
}

/// An effect that succeeds with `()`.
pub fn unit<E: Send + 'static>() -> Effect<(), E> {
    Effect::unit()
}

/// An effect that waits for `duration`.
pub fn sleep<E: Send + 'static>(duration: Duration) -> Effect<(), E> {
    Effect::sleep(duration)
}

/// An effect that never completes.
pub fn never<A, E>() -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Effect::never()
}

/// Bridge an already-running fiber into an effect.
pub fn from_fiber<A, E>(fiber: &Fiber<A, E>) -> Effect<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    Effect::from_fiber(fiber)
}
