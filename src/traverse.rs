//! Sequence and traverse for collections of effects
//!
//! # Core Concepts
//!
//! - **`sequence`**: Convert a collection of effects into an effect of a collection
//!   - `Vec<Effect<T, E>>` → `Effect<Vec<T>, E>`
//!
//! - **`traverse`**: Map a function over a collection and sequence the results
//!
//! Both run strictly left to right: the side effects of one element happen
//! before the next element starts, and the first failure stops the rest.
//! For the concurrent counterparts see
//! [`concurrent_traverse`](crate::effect::concurrent_traverse).
//!
//! # Examples
//!
//! ```
//! use undertow::{traverse::traverse, Effect};
//!
//! fn parse(s: &'static str) -> Effect<i32, String> {
//!     Effect::from_fn(move || s.parse().map_err(|_| format!("invalid number: {}", s)))
//! }
//!
//! assert_eq!(traverse(vec!["1", "2", "3"], parse).run_blocking(), Ok(vec![1, 2, 3]));
//! assert_eq!(
//!     traverse(vec!["1", "x", "3"], parse).run_blocking(),
//!     Err("invalid number: x".to_string())
//! );
//! ```

use std::sync::Arc;

use crate::effect::node::{unbox, Next};
use crate::Effect;

/// Run each effect in order and collect their values.
///
/// # Examples
///
/// ```
/// use undertow::{traverse::sequence, Effect};
///
/// let effects = vec![
///     Effect::<_, String>::succeed(1),
///     Effect::succeed(2),
///     Effect::succeed(3),
/// ];
/// assert_eq!(sequence(effects).run_blocking(), Ok(vec![1, 2, 3]));
/// ```
pub fn sequence<A, E, I>(effects: I) -> Effect<Vec<A>, E>
where
    A: Send + 'static,
    E: Send + 'static,
    I: IntoIterator<Item = Effect<A, E>>,
{
    effects
        .into_iter()
        .fold(Effect::<Vec<A>, E>::delay(Vec::new), |collected, effect| {
            let next = effect.into_node();
            collected.bind(move |mut values: Vec<A>| {
                Next::Then(
                    Arc::clone(&next),
                    Box::new(move |value| {
                        values.push(unbox(value));
                        Next::done::<Vec<A>, E>(Ok(values))
                    }),
                )
            })
        })
}

/// Apply `f` to each item and run the resulting effects in order.
///
/// `f` is applied while building the effect; nothing runs until it is
/// interpreted.
pub fn traverse<T, A, E, I, F>(items: I, f: F) -> Effect<Vec<A>, E>
where
    A: Send + 'static,
    E: Send + 'static,
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Effect<A, E>,
{
    sequence(items.into_iter().map(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorded(log: &Arc<Mutex<Vec<i32>>>, n: i32) -> Effect<i32, String> {
        let log = Arc::clone(log);
        Effect::delay(move || {
            log.lock().push(n);
            n
        })
    }

    #[test]
    fn test_sequence_empty() {
        let effect = sequence(Vec::<Effect<i32, String>>::new());
        assert_eq!(effect.run_blocking(), Ok(vec![]));
    }

    #[test]
    fn test_sequence_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let effect = sequence((1..=3).map(|n| recorded(&log, n)));

        assert!(log.lock().is_empty());
        assert_eq!(effect.run_blocking(), Ok(vec![1, 2, 3]));
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_sequence_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let effects = vec![
            recorded(&log, 1),
            Effect::fail("second".to_string()),
            recorded(&log, 3),
        ];

        assert_eq!(sequence(effects).run_blocking(), Err("second".to_string()));
        assert_eq!(*log.lock(), vec![1]);
    }

    #[test]
    fn test_sequence_is_reusable() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let effect = traverse(vec![4, 5], |n| recorded(&log, n));

        assert_eq!(effect.clone().run_blocking(), Ok(vec![4, 5]));
        assert_eq!(effect.run_blocking(), Ok(vec![4, 5]));
        assert_eq!(*log.lock(), vec![4, 5, 4, 5]);
    }

    #[test]
    fn test_traverse_large_input_is_stack_safe() {
        let effect = traverse(0..100_000, |n| Effect::<_, String>::succeed(n));
        let values = effect.run_blocking().unwrap();
        assert_eq!(values.len(), 100_000);
        assert_eq!(values[99_999], 99_999);
    }
}
