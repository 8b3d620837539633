//! The trampoline interpreter.
//!
//! [`interpret`] walks an effect tree with an explicit stack of pending
//! continuations instead of native recursion:
//!
//! - `FlatMap` and `Attempt` push a frame and descend into their source.
//! - `Thunk` runs inline; its outcome then unwinds frames in a loop until a
//!   continuation yields another node or the stack empties.
//! - `Async` submits its registration function to its scheduler and parks
//!   the stack. If the callback fires on the submitting thread before
//!   `submit` returns (an immediate scheduler, an already-completed fiber)
//!   the loop picks the outcome up and carries on, so synchronous async nodes
//!   do not grow the native stack either. A callback fired from any other
//!   thread waits for the stack to be parked and resumes it itself.
//!
//! A panic in a thunk, a continuation or a registration is caught and ends
//! the interpretation as [`Exit::Panicked`], skipping every pending frame.
//!
//! The finisher passed to [`interpret`] is called at most once, and exactly
//! once unless some async node never completes.

use std::mem;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use super::node::{Bind, Exit, Finish, Next, Node, Outcome, Register, Reify, Resume, Sink, Step};
use crate::scheduler::SchedulerRef;

enum Frame {
    Bind(Bind),
    Resume(Resume),
    Reify(Reify),
}

enum Unwound {
    Continue(Node),
    Finished(Exit),
}

enum State {
    Submitting,
    Early(Exit),
    Parked(Vec<Frame>, Finish),
    Resumed,
}

/// Meeting point between the thread that submits an async node and the
/// thread that completes it.
struct Handoff {
    state: Mutex<State>,
    parked: Condvar,
    submitter: ThreadId,
}

enum Suspension {
    Parked,
    Inline {
        exit: Exit,
        stack: Vec<Frame>,
        finish: Finish,
    },
}

/// Drive `node` to completion, reporting how it ended to `finish`.
pub(crate) fn interpret(node: Node, finish: Finish) {
    drive(node, Vec::new(), finish);
}

fn drive(mut current: Node, mut stack: Vec<Frame>, mut finish: Finish) {
    loop {
        let step = Arc::clone(&current);
        let exit = match &*step {
            Step::Thunk(thunk) => match catch_unwind(AssertUnwindSafe(|| thunk())) {
                Ok(outcome) => Exit::Settled(outcome),
                Err(panic) => Exit::Panicked(panic),
            },
            Step::FlatMap { source, bind } => {
                stack.push(Frame::Bind(Arc::clone(bind)));
                current = Arc::clone(source);
                continue;
            }
            Step::Attempt { source, reify } => {
                stack.push(Frame::Reify(Arc::clone(reify)));
                current = Arc::clone(source);
                continue;
            }
            Step::Async {
                register,
                scheduler,
            } => match suspend(Arc::clone(register), scheduler, stack, finish) {
                Suspension::Parked => return,
                Suspension::Inline {
                    exit,
                    stack: kept,
                    finish: same,
                } => {
                    stack = kept;
                    finish = same;
                    exit
                }
            },
        };

        match settle(&mut stack, exit) {
            Unwound::Continue(next) => current = next,
            Unwound::Finished(exit) => {
                finish(exit);
                return;
            }
        }
    }
}

fn settle(stack: &mut Vec<Frame>, exit: Exit) -> Unwound {
    match exit {
        Exit::Settled(outcome) => unwind(stack, outcome),
        Exit::Panicked(panic) => Unwound::Finished(Exit::Panicked(panic)),
    }
}

/// Feed `outcome` to pending frames until one yields a node to run.
fn unwind(stack: &mut Vec<Frame>, mut outcome: Outcome) -> Unwound {
    while let Some(frame) = stack.pop() {
        let applied = catch_unwind(AssertUnwindSafe(move || match (frame, outcome) {
            (Frame::Bind(bind), Ok(value)) => bind(value),
            (Frame::Resume(resume), Ok(value)) => resume(value),
            (Frame::Reify(reify), settled) => Next::Done(Ok(reify(settled))),
            (Frame::Bind(_) | Frame::Resume(_), Err(error)) => Next::Done(Err(error)),
        }));
        let next = match applied {
            Ok(next) => next,
            Err(panic) => return Unwound::Finished(Exit::Panicked(panic)),
        };

        match next {
            Next::Run(node) => return Unwound::Continue(node),
            Next::Then(node, resume) => {
                stack.push(Frame::Resume(resume));
                return Unwound::Continue(node);
            }
            Next::Done(settled) => outcome = settled,
        }
    }
    Unwound::Finished(Exit::Settled(outcome))
}

impl Handoff {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Submitting),
            parked: Condvar::new(),
            submitter: thread::current().id(),
        }
    }

    /// Hand `exit` to the suspended stack. Gives `exit` back when the stack
    /// was already handed something else.
    fn deliver(&self, exit: Exit) -> Result<(), Exit> {
        let mut state = self.state.lock();
        if thread::current().id() != self.submitter {
            while matches!(*state, State::Submitting) {
                self.parked.wait(&mut state);
            }
        }

        match mem::replace(&mut *state, State::Resumed) {
            State::Parked(stack, finish) => {
                drop(state);
                tracing::trace!(frames = stack.len(), "resuming parked effect");
                resume(exit, stack, finish);
                Ok(())
            }
            State::Submitting => {
                *state = State::Early(exit);
                Ok(())
            }
            previous @ (State::Early(_) | State::Resumed) => {
                *state = previous;
                Err(exit)
            }
        }
    }
}

fn suspend(
    register: Register,
    scheduler: &SchedulerRef,
    stack: Vec<Frame>,
    finish: Finish,
) -> Suspension {
    let handoff = Arc::new(Handoff::new());

    let callback: Sink = {
        let handoff = Arc::clone(&handoff);
        Box::new(move |outcome| {
            if handoff.deliver(Exit::Settled(outcome)).is_err() {
                tracing::trace!("ignoring completion of an already settled async node");
            }
        })
    };

    let guard = Arc::clone(&handoff);
    scheduler.submit(Box::new(move || {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| register(callback))) {
            // Once the callback has fired, the panic came from code that ran
            // after it and belongs to whoever runs this work.
            if let Err(Exit::Panicked(panic)) = guard.deliver(Exit::Panicked(panic)) {
                resume_unwind(panic);
            }
        }
    }));

    let mut state = handoff.state.lock();
    match mem::replace(&mut *state, State::Resumed) {
        State::Early(exit) => Suspension::Inline {
            exit,
            stack,
            finish,
        },
        _ => {
            tracing::trace!(frames = stack.len(), "parking effect at async boundary");
            *state = State::Parked(stack, finish);
            drop(state);
            handoff.parked.notify_all();
            Suspension::Parked
        }
    }
}

fn resume(exit: Exit, mut stack: Vec<Frame>, finish: Finish) {
    match settle(&mut stack, exit) {
        Unwound::Continue(node) => drive(node, stack, finish),
        Unwound::Finished(exit) => finish(exit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::node::{erase, restore, Value};
    use crate::scheduler::immediate;
    use std::sync::mpsc;

    fn settled(exit: Exit) -> Result<i32, String> {
        match exit {
            Exit::Settled(outcome) => restore(outcome),
            Exit::Panicked(_) => panic!("interpretation panicked"),
        }
    }

    fn run(node: Node) -> Result<i32, String> {
        let (tx, rx) = mpsc::channel();
        interpret(node, Box::new(move |exit| tx.send(settled(exit)).unwrap()));
        rx.recv().unwrap()
    }

    fn panic_message(node: Node) -> Option<String> {
        let (tx, rx) = mpsc::channel();
        interpret(
            node,
            Box::new(move |exit| {
                let message = match exit {
                    Exit::Panicked(panic) => panic.downcast_ref::<&str>().map(|m| m.to_string()),
                    Exit::Settled(_) => None,
                };
                tx.send(message).unwrap()
            }),
        );
        rx.recv().unwrap()
    }

    fn thunk(result: Result<i32, String>) -> Node {
        Arc::new(Step::Thunk(Box::new(move || erase(result.clone()))))
    }

    fn add_one() -> Bind {
        Arc::new(|v: Value| {
            let n = *v.downcast::<i32>().unwrap();
            Next::done::<i32, String>(Ok(n + 1))
        })
    }

    #[test]
    fn test_thunk_success() {
        assert_eq!(run(thunk(Ok(1))), Ok(1));
    }

    #[test]
    fn test_flat_map_skips_bind_on_failure() {
        let node = Arc::new(Step::FlatMap {
            source: thunk(Err("boom".to_string())),
            bind: Arc::new(|_: Value| panic!("continuation must not run")),
        });
        assert_eq!(run(node), Err("boom".to_string()));
    }

    #[test]
    fn test_attempt_reifies_failure() {
        let node = Arc::new(Step::Attempt {
            source: thunk(Err("boom".to_string())),
            reify: Arc::new(|o| {
                let settled: Result<i32, String> = restore(o);
                Box::new(settled.map_or(-1, |n| n)) as Value
            }),
        });
        assert_eq!(run(node), Ok(-1));
    }

    #[test]
    fn test_async_on_immediate_completes_inline() {
        let register: Register = Arc::new(|sink: Sink| sink(erase::<i32, String>(Ok(5))));
        let node = Arc::new(Step::Async {
            register,
            scheduler: immediate(),
        });
        assert_eq!(run(node), Ok(5));
    }

    #[test]
    fn test_long_synchronous_async_chain_is_stack_safe() {
        let mut node: Node = thunk(Ok(0));
        for _ in 0..100_000 {
            let register: Register = Arc::new(|sink: Sink| sink(erase::<(), String>(Ok(()))));
            let hop: Node = Arc::new(Step::Async {
                register,
                scheduler: immediate(),
            });
            let add = add_one();
            node = Arc::new(Step::FlatMap {
                source: node,
                bind: Arc::new(move |v| Next::Then(Arc::clone(&hop), {
                    let add = Arc::clone(&add);
                    Box::new(move |_| add(v))
                })),
            });
        }
        assert_eq!(run(node), Ok(100_000));
    }

    #[test]
    fn test_parked_effect_resumes_on_completing_thread() {
        let (tx, rx) = mpsc::channel::<Sink>();
        let tx = Mutex::new(tx);
        let register: Register = Arc::new(move |sink: Sink| tx.lock().send(sink).unwrap());
        let node = Arc::new(Step::FlatMap {
            source: Arc::new(Step::Async {
                register,
                scheduler: immediate(),
            }),
            bind: add_one(),
        });

        let (done_tx, done_rx) = mpsc::channel();
        interpret(
            node,
            Box::new(move |exit| done_tx.send(settled(exit)).unwrap()),
        );
        assert!(done_rx.try_recv().is_err());

        let sink = rx.recv().unwrap();
        std::thread::spawn(move || sink(erase::<i32, String>(Ok(41))))
            .join()
            .unwrap();
        assert_eq!(done_rx.recv().unwrap(), Ok(42));
    }

    #[test]
    fn test_panicking_thunk_skips_pending_frames() {
        let node = Arc::new(Step::Attempt {
            source: Arc::new(Step::Thunk(Box::new(|| -> Outcome { panic!("thunk blew up") }))),
            reify: Arc::new(|_: Outcome| -> Value { panic!("reifier must not run") }),
        });
        assert_eq!(panic_message(node), Some("thunk blew up".to_string()));
    }

    #[test]
    fn test_panicking_continuation_ends_interpretation() {
        let node = Arc::new(Step::FlatMap {
            source: thunk(Ok(1)),
            bind: Arc::new(|_: Value| panic!("bind blew up")),
        });
        assert_eq!(panic_message(node), Some("bind blew up".to_string()));
    }

    #[test]
    fn test_panicking_registration_ends_interpretation() {
        let register: Register = Arc::new(|_: Sink| panic!("register blew up"));
        let node = Arc::new(Step::Async {
            register,
            scheduler: immediate(),
        });
        assert_eq!(panic_message(node), Some("register blew up".to_string()));
    }

    #[test]
    fn test_foreign_completion_never_runs_continuation_on_submitter() {
        let submitter = std::thread::current().id();
        for _ in 0..500 {
            let register: Register = Arc::new(|sink: Sink| {
                std::thread::spawn(move || sink(erase::<i32, String>(Ok(0))));
            });
            let node = Arc::new(Step::FlatMap {
                source: Arc::new(Step::Async {
                    register,
                    scheduler: immediate(),
                }),
                bind: Arc::new(move |_: Value| {
                    Next::done::<bool, String>(Ok(std::thread::current().id() == submitter))
                }),
            });

            let (tx, rx) = mpsc::channel();
            interpret(
                node,
                Box::new(move |exit| {
                    if let Exit::Settled(outcome) = exit {
                        tx.send(restore::<bool, String>(outcome)).unwrap();
                    }
                }),
            );
            assert_eq!(rx.recv().unwrap(), Ok(false));
        }
    }
}
