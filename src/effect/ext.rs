//! Sequencing and error-handling combinators.
//!
//! Everything here is expressed with the two composite nodes, `FlatMap` and
//! `Attempt`. Continuations that need to carry an already-computed value
//! across a second effect use [`Next::Then`] so the value is moved, not
//! cloned.

use std::sync::Arc;

use super::node::{restore, unbox, Next, Step, Value};
use super::Effect;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Attach a raw continuation to the success value.
    pub(crate) fn bind<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: Fn(A) -> Next + Send + Sync + 'static,
    {
        Effect::from_step(Step::FlatMap {
            source: self.into_node(),
            bind: Arc::new(move |value| f(unbox(value))),
        })
    }

    /// Turn the outcome into a success value with an arbitrary error type.
    pub(crate) fn reify<E2: Send + 'static>(self) -> Effect<Result<A, E>, E2> {
        Effect::from_step(Step::Attempt {
            source: self.into_node(),
            reify: Arc::new(|outcome| Box::new(restore::<A, E>(outcome)) as Value),
        })
    }

    /// Transform the success value.
    ///
    /// ```
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<_, String>::succeed(5).map(|x| x * 2);
    /// assert_eq!(effect.run_blocking(), Ok(10));
    /// ```
    pub fn map<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.bind(move |a| Next::done::<B, E>(Ok(f(a))))
    }

    /// Continue with the effect produced from the success value.
    ///
    /// `f` is not called when `self` fails; the failure propagates as is.
    pub fn flat_map<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: Fn(A) -> Effect<B, E> + Send + Sync + 'static,
    {
        self.bind(move |a| Next::Run(f(a).into_node()))
    }

    /// Reify the outcome of `self` as a value.
    ///
    /// The resulting effect always succeeds: with `Ok(a)` when `self`
    /// succeeds and with `Err(e)` when it fails.
    pub fn attempt(self) -> Effect<Result<A, E>, E> {
        self.reify()
    }

    /// Recover from a failure by switching to another effect.
    ///
    /// ```
    /// use undertow::Effect;
    ///
    /// let effect = Effect::<i32, _>::fail("down".to_string())
    ///     .handle_error_with(|e| Effect::succeed(e.len() as i32));
    /// assert_eq!(effect.run_blocking(), Ok(4));
    /// ```
    pub fn handle_error_with<F>(self, f: F) -> Effect<A, E>
    where
        F: Fn(E) -> Effect<A, E> + Send + Sync + 'static,
    {
        self.reify::<E>().bind(move |settled| match settled {
            Ok(a) => Next::done::<A, E>(Ok(a)),
            Err(e) => Next::Run(f(e).into_node()),
        })
    }

    /// Recover from a failure with a plain value.
    pub fn handle_error<F>(self, f: F) -> Effect<A, E>
    where
        F: Fn(E) -> A + Send + Sync + 'static,
    {
        self.reify::<E>()
            .bind(move |settled| Next::done::<A, E>(Ok(settled.unwrap_or_else(&f))))
    }

    /// Transform the error value, changing the error type.
    pub fn map_err<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: Fn(E) -> E2 + Send + Sync + 'static,
    {
        self.reify::<E2>()
            .bind(move |settled| Next::done::<A, E2>(settled.map_err(&f)))
    }

    /// Run `self`, then `that`, and combine both values.
    ///
    /// `that` starts only after `self` has fully completed. Either failure
    /// short-circuits the rest.
    pub fn map2<B, C, F>(self, that: Effect<B, E>, f: F) -> Effect<C, E>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let that = that.into_node();
        self.bind(move |a| {
            let f = Arc::clone(&f);
            Next::Then(
                Arc::clone(&that),
                Box::new(move |b| Next::done::<C, E>(Ok(f(a, unbox(b))))),
            )
        })
    }

    /// Run `self`, then `that`, and pair the values.
    pub fn tuple2<B>(self, that: Effect<B, E>) -> Effect<(A, B), E>
    where
        B: Send + 'static,
    {
        self.map2(that, |a, b| (a, b))
    }

    /// Run `self`, then `that`, keeping the value of `self`.
    pub fn product_l<B>(self, that: Effect<B, E>) -> Effect<A, E>
    where
        B: Send + 'static,
    {
        self.map2(that, |a, _| a)
    }

    /// Run `self`, then `that`, keeping the value of `that`.
    pub fn product_r<B>(self, that: Effect<B, E>) -> Effect<B, E>
    where
        B: Send + 'static,
    {
        let that = that.into_node();
        self.bind(move |_| Next::Run(Arc::clone(&that)))
    }

    /// Replace the success value with `value`.
    pub fn as_value<B>(self, value: B) -> Effect<B, E>
    where
        B: Clone + Send + Sync + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Discard the success value.
    pub fn void(self) -> Effect<(), E> {
        self.map(|_| ())
    }

    /// Observe the success value without changing it.
    ///
    /// ```
    /// use undertow::Effect;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let log = seen.clone();
    /// let effect = Effect::<_, String>::succeed(3).tap(move |n| log.lock().unwrap().push(*n));
    ///
    /// assert_eq!(effect.run_blocking(), Ok(3));
    /// assert_eq!(*seen.lock().unwrap(), vec![3]);
    /// ```
    pub fn tap<F>(self, f: F) -> Effect<A, E>
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.map(move |a| {
            f(&a);
            a
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[test]
    fn test_map_err_changes_error_type() {
        let effect = Effect::<i32, _>::fail(7_u8).map_err(|code| format!("code {code}"));
        assert_eq!(effect.run_blocking(), Err("code 7".to_string()));
    }

    #[test]
    fn test_map_err_leaves_success_alone() {
        let effect = Effect::<_, u8>::succeed(1).map_err(|_| "unused");
        assert_eq!(effect.run_blocking(), Ok(1));
    }

    #[test]
    fn test_handle_error_only_on_failure() {
        let ok = Effect::<_, String>::succeed(1).handle_error(|_| 0);
        let recovered = Effect::<i32, _>::fail("x".to_string()).handle_error(|_| 0);
        assert_eq!(ok.run_blocking(), Ok(1));
        assert_eq!(recovered.run_blocking(), Ok(0));
    }

    #[test]
    fn test_map2_short_circuits_on_left_failure() {
        let right = Effect::<i32, String>::from_fn(|| panic!("right side must not run"));
        let effect = Effect::<i32, _>::fail("left".to_string()).map2(right, |a, b| a + b);
        assert_eq!(effect.run_blocking(), Err("left".to_string()));
    }

    #[test]
    fn test_map2_propagates_right_failure() {
        let effect = Effect::<_, String>::succeed(1)
            .map2(Effect::<i32, _>::fail("right".to_string()), |a, b| a + b);
        assert_eq!(effect.run_blocking(), Err("right".to_string()));
    }

    #[test]
    fn test_products_keep_the_chosen_side() {
        let left = Effect::<_, String>::succeed("l").product_l(Effect::succeed("r"));
        let right = Effect::<_, String>::succeed("l").product_r(Effect::succeed("r"));
        assert_eq!(left.run_blocking(), Ok("l"));
        assert_eq!(right.run_blocking(), Ok("r"));
    }

    #[test]
    fn test_void_and_as_value() {
        assert_eq!(Effect::<_, String>::succeed(9).void().run_blocking(), Ok(()));
        assert_eq!(
            Effect::<_, String>::succeed(9).as_value("nine").run_blocking(),
            Ok("nine")
        );
    }
}
