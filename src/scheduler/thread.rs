//! Thread-per-task scheduler.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::thread;

use super::{default_hook, run_guarded, FailureHook, Scheduler, SchedulerRef, Work, WorkFailure};

/// Spawns one named OS thread for every unit of submitted work.
///
/// Threads are named `<name>-<n>` where `n` counts submissions. Blocking
/// inside submitted work is fine: it only ever blocks its own thread.
///
/// # Example
///
/// ```rust
/// use undertow::scheduler::ThreadScheduler;
/// use undertow::Effect;
/// use std::sync::Arc;
///
/// let workers = Arc::new(ThreadScheduler::builder().name("io").build());
/// let effect = Effect::<_, String>::delay(|| 21).map(|x| x * 2).eval_on(workers);
/// assert_eq!(effect.run_blocking(), Ok(42));
/// ```
#[derive(Clone)]
pub struct ThreadScheduler {
    inner: Arc<Config>,
}

struct Config {
    name: String,
    stack_size: Option<usize>,
    on_failure: FailureHook,
    spawned: AtomicUsize,
}

impl ThreadScheduler {
    /// Create a scheduler with default settings (threads named `undertow-worker-<n>`).
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a scheduler.
    pub fn builder() -> ThreadSchedulerBuilder {
        ThreadSchedulerBuilder::default()
    }

    /// Name prefix given to spawned threads.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of units of work submitted so far.
    pub fn spawned(&self) -> usize {
        self.inner.spawned.load(Ordering::Relaxed)
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("name", &self.inner.name)
            .field("stack_size", &self.inner.stack_size)
            .field("spawned", &self.spawned())
            .field("on_failure", &"<hook>")
            .finish()
    }
}

impl Scheduler for ThreadScheduler {
    fn submit(&self, work: Work) {
        let id = self.inner.spawned.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{}", self.inner.name, id));
        if let Some(size) = self.inner.stack_size {
            builder = builder.stack_size(size);
        }

        let config = Arc::clone(&self.inner);
        let spawned = builder.spawn(move || {
            run_guarded(&config.name, work, |failure| (config.on_failure)(failure));
        });

        if let Err(err) = spawned {
            self.report_failure(WorkFailure::new(
                self.inner.name.clone(),
                format!("could not spawn worker thread: {}", err),
            ));
        }
    }

    fn report_failure(&self, failure: WorkFailure) {
        (self.inner.on_failure)(failure);
    }
}

/// Builder for [`ThreadScheduler`].
pub struct ThreadSchedulerBuilder {
    name: String,
    stack_size: Option<usize>,
    on_failure: FailureHook,
}

impl Default for ThreadSchedulerBuilder {
    fn default() -> Self {
        Self {
            name: "undertow-worker".to_string(),
            stack_size: None,
            on_failure: default_hook(),
        }
    }
}

impl fmt::Debug for ThreadSchedulerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSchedulerBuilder")
            .field("name", &self.name)
            .field("stack_size", &self.stack_size)
            .finish_non_exhaustive()
    }
}

impl ThreadSchedulerBuilder {
    /// Prefix for spawned thread names.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stack size for spawned threads, in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Replace the default (logging) failure hook.
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(WorkFailure) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(hook);
        self
    }

    /// Finish building.
    pub fn build(self) -> ThreadScheduler {
        ThreadScheduler {
            inner: Arc::new(Config {
                name: self.name,
                stack_size: self.stack_size,
                on_failure: self.on_failure,
                spawned: AtomicUsize::new(0),
            }),
        }
    }
}

static SLEEPER: LazyLock<SchedulerRef> =
    LazyLock::new(|| Arc::new(ThreadScheduler::builder().name("undertow-sleep").build()));

/// Backs `Effect::sleep`: each wait gets its own thread.
pub(crate) fn sleeper() -> SchedulerRef {
    Arc::clone(&SLEEPER)
}
