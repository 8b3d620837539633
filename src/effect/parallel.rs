//! Fork/join and concurrent combinators.
//!
//! All of them reduce to [`Effect::start`]: interpreting a started effect
//! submits the source to a scheduler right away and yields a join effect
//! over a [`Fiber`](crate::Fiber). Concurrency comes from forking every
//! operand before joining any of them.
//!
//! - `start` - fork, returning the join effect
//! - `eval_on` - fork and join immediately
//! - `concurrent_map2`, `concurrent_tuple` - fork two effects, combine
//! - [`concurrent_traverse`], [`concurrent_sequence`] - fork many, collect
//!   in input order

use std::sync::Arc;

use super::Effect;
use crate::scheduler::SchedulerRef;
use crate::traverse::sequence;

impl<A, E> Effect<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Fork: begin running `self` on `scheduler`.
    ///
    /// Interpreting the returned effect submits `self` immediately and
    /// succeeds with a join effect. The computation runs once per
    /// interpretation of the outer effect; every interpretation of a given
    /// join effect observes the same cached outcome.
    ///
    /// ```
    /// use undertow::scheduler::ThreadScheduler;
    /// use undertow::Effect;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    /// use std::sync::Arc;
    ///
    /// let runs = Arc::new(AtomicU32::new(0));
    /// let counter = runs.clone();
    /// let work = Effect::<_, String>::delay(move || counter.fetch_add(1, Ordering::SeqCst));
    ///
    /// let join = work.start(Arc::new(ThreadScheduler::new())).run_blocking().unwrap();
    /// assert_eq!(join.clone().run_blocking(), Ok(0));
    /// assert_eq!(join.run_blocking(), Ok(0));
    /// assert_eq!(runs.load(Ordering::SeqCst), 1);
    /// ```
    pub fn start(self, scheduler: SchedulerRef) -> Effect<Effect<A, E>, E> {
        let source = self.into_node();
        Effect::delay(move || {
            Effect::<A, E>::from_node(Arc::clone(&source))
                .run_fiber(Arc::clone(&scheduler))
                .join()
        })
    }

    /// Run the whole of `self` on `scheduler` and wait for it.
    ///
    /// Whatever follows `eval_on` continues on the thread that completed it.
    pub fn eval_on(self, scheduler: SchedulerRef) -> Effect<A, E> {
        self.start(scheduler).flat_map(|join| join)
    }

    /// Run `self` and `that` concurrently and combine their values.
    ///
    /// Both are forked, `self` first, before either is joined, so the total
    /// time is that of the slower one. The first failure, in argument order,
    /// is reported.
    pub fn concurrent_map2<B, C, F>(
        self,
        that: Effect<B, E>,
        scheduler: SchedulerRef,
        f: F,
    ) -> Effect<C, E>
    where
        B: Clone + Send + Sync + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let left = self.start(Arc::clone(&scheduler));
        let right = that.start(scheduler);
        left.map2(right, move |join_a, join_b| {
            let f = Arc::clone(&f);
            join_a.map2(join_b, move |a, b| f(a, b))
        })
        .flat_map(|joined| joined)
    }

    /// Run `self` and `that` concurrently and pair their values.
    pub fn concurrent_tuple<B>(
        self,
        that: Effect<B, E>,
        scheduler: SchedulerRef,
    ) -> Effect<(A, B), E>
    where
        B: Clone + Send + Sync + 'static,
    {
        self.concurrent_map2(that, scheduler, |a, b| (a, b))
    }
}

/// Fork `f(x)` for every item, then collect the values in input order.
///
/// Forks are submitted in input order; completion order does not affect the
/// order of the result. The first failure in input order is reported.
///
/// ```
/// use undertow::effect::concurrent_traverse;
/// use undertow::scheduler::ThreadScheduler;
/// use undertow::Effect;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let effect = concurrent_traverse(vec![30_u64, 10, 20], Arc::new(ThreadScheduler::new()), |ms| {
///     Effect::<(), String>::sleep(Duration::from_millis(ms)).as_value(ms)
/// });
/// assert_eq!(effect.run_blocking(), Ok(vec![30, 10, 20]));
/// ```
pub fn concurrent_traverse<T, A, E, I, F>(
    items: I,
    scheduler: SchedulerRef,
    f: F,
) -> Effect<Vec<A>, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
    F: Fn(T) -> Effect<A, E>,
{
    let forks: Vec<Effect<Effect<A, E>, E>> = items
        .into_iter()
        .map(|item| f(item).start(Arc::clone(&scheduler)))
        .collect();
    sequence(forks).flat_map(|joins| sequence(joins))
}

/// Run every effect concurrently and collect the values in input order.
pub fn concurrent_sequence<A, E, I>(effects: I, scheduler: SchedulerRef) -> Effect<Vec<A>, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Effect<A, E>>,
{
    concurrent_traverse(effects, scheduler, |effect| effect)
}
