//! Tracing instrumentation for effects.
//!
//! A span cannot stay entered across an async boundary, since the effect may
//! finish on another thread. Instead the span is entered around the events
//! it brackets: one when interpretation starts and one with the outcome.

use std::sync::Arc;
use std::time::Instant;

use tracing::Span;

use super::node::{unbox, Next};
use super::Effect;

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Report this effect's start and outcome inside `span`.
    ///
    /// Emits `effect started` when interpretation reaches the effect, then
    /// `effect succeeded` or `effect failed` with an `elapsed_ms` field, all
    /// at debug level. The outcome itself passes through unchanged.
    ///
    /// # Example
    ///
    /// ```rust
    /// use undertow::Effect;
    /// use tracing::info_span;
    ///
    /// let order_id = 42;
    /// let effect = Effect::<_, String>::delay(move || order_id * 2)
    ///     .instrument(info_span!("fetch_order", order_id));
    /// assert_eq!(effect.run_blocking(), Ok(84));
    /// ```
    pub fn instrument(self, span: Span) -> Effect<A, E> {
        let source = self.reify::<E>().into_node();
        let opened = span.clone();

        Effect::<Instant, E>::delay(move || {
            let _entered = opened.enter();
            tracing::debug!("effect started");
            Instant::now()
        })
        .bind(move |started: Instant| {
            let span = span.clone();
            Next::Then(
                Arc::clone(&source),
                Box::new(move |settled| {
                    let settled: Result<A, E> = unbox(settled);
                    let _entered = span.enter();
                    let elapsed_ms =
                        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                    match &settled {
                        Ok(_) => tracing::debug!(elapsed_ms, "effect succeeded"),
                        Err(_) => tracing::debug!(elapsed_ms, "effect failed"),
                    }
                    Next::done(settled)
                }),
            )
        })
    }
}
