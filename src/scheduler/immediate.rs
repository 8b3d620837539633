//! The synchronous, inline scheduler.

use std::sync::{Arc, LazyLock};

use super::{run_guarded, Scheduler, SchedulerRef, Work};

/// Runs submitted work synchronously, in the calling context.
///
/// Stateless; use [`immediate()`] to get the shared process-wide handle.
/// Bridging an already-running [`Fiber`](crate::Fiber) into an effect uses
/// this scheduler, since the fiber's own scheduler already did the hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn submit(&self, work: Work) {
        run_guarded("immediate", work, |failure| self.report_failure(failure));
    }
}

static IMMEDIATE: LazyLock<SchedulerRef> = LazyLock::new(|| Arc::new(Immediate));

/// The shared [`Immediate`] scheduler.
pub fn immediate() -> SchedulerRef {
    Arc::clone(&IMMEDIATE)
}
