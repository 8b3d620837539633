//! Type-erased effect nodes.
//!
//! `Effect<A, E>` is a typed view over an untyped tree of [`Step`]s. Values
//! and errors travel through the interpreter as `Box<dyn Any + Send>` and are
//! downcast back at the typed edges (continuations, reifiers, callbacks).

use std::any::Any;
use std::sync::{Arc, LazyLock};

use crate::scheduler::SchedulerRef;

pub(crate) type Value = Box<dyn Any + Send>;
pub(crate) type Outcome = Result<Value, Value>;
pub(crate) type Sink = Box<dyn FnOnce(Outcome) + Send>;
pub(crate) type Finish = Box<dyn FnOnce(Exit) + Send>;
pub(crate) type Panic = Box<dyn Any + Send>;
pub(crate) type Node = Arc<Step>;

pub(crate) type Thunk = Box<dyn Fn() -> Outcome + Send + Sync>;
pub(crate) type Register = Arc<dyn Fn(Sink) + Send + Sync>;
pub(crate) type Bind = Arc<dyn Fn(Value) -> Next + Send + Sync>;
pub(crate) type Reify = Arc<dyn Fn(Outcome) -> Value + Send + Sync>;
pub(crate) type Resume = Box<dyn FnOnce(Value) -> Next + Send>;

/// The closed set of effect variants.
pub(crate) enum Step {
    /// Synchronous computation, run on whichever thread interprets it.
    Thunk(Thunk),
    /// Registration function submitted to a scheduler; it owns the callback.
    Async {
        register: Register,
        scheduler: SchedulerRef,
    },
    /// Run `source`, then feed its success value to `bind`.
    FlatMap { source: Node, bind: Bind },
    /// Run `source` and report its outcome, success or failure, as a value.
    Attempt { source: Node, reify: Reify },
}

/// How one interpretation ended.
pub(crate) enum Exit {
    Settled(Outcome),
    /// A thunk, continuation or registration panicked. No frame sees it.
    Panicked(Panic),
}

/// What a continuation wants the interpreter to do next.
pub(crate) enum Next {
    /// Continue with another node.
    Run(Node),
    /// Run a node, then hand its success value to a one-shot continuation.
    Then(Node, Resume),
    /// Settle immediately with an outcome.
    Done(Outcome),
}

impl Next {
    pub(crate) fn done<A, E>(result: Result<A, E>) -> Self
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        Next::Done(erase(result))
    }
}

impl Step {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Step::Thunk(_) => "thunk",
            Step::Async { .. } => "async",
            Step::FlatMap { .. } => "flat_map",
            Step::Attempt { .. } => "attempt",
        }
    }

    fn take_source(&mut self) -> Option<Node> {
        match self {
            Step::FlatMap { source, .. } | Step::Attempt { source, .. } => {
                Some(std::mem::replace(source, Arc::clone(&VACANT)))
            }
            Step::Thunk(_) | Step::Async { .. } => None,
        }
    }
}

static VACANT: LazyLock<Node> =
    LazyLock::new(|| Arc::new(Step::Thunk(Box::new(|| Ok(Box::new(()) as Value)))));

// Left-nested chains (folds, long `flat_map` sequences) would otherwise drop
// recursively, one native frame per level.
impl Drop for Step {
    fn drop(&mut self) {
        let mut pending: Vec<Node> = self.take_source().into_iter().collect();
        while let Some(node) = pending.pop() {
            if let Ok(mut step) = Arc::try_unwrap(node) {
                pending.extend(step.take_source());
            }
        }
    }
}

pub(crate) fn erase<A, E>(result: Result<A, E>) -> Outcome
where
    A: Send + 'static,
    E: Send + 'static,
{
    match result {
        Ok(value) => Ok(Box::new(value)),
        Err(error) => Err(Box::new(error)),
    }
}

pub(crate) fn restore<A: 'static, E: 'static>(outcome: Outcome) -> Result<A, E> {
    match outcome {
        Ok(value) => Ok(unbox(value)),
        Err(error) => Err(unbox(error)),
    }
}

pub(crate) fn unbox<T: 'static>(value: Value) -> T {
    *value
        .downcast::<T>()
        .expect("type mismatch between effect node and continuation")
}
