//! Integration tests for fork/join and the concurrent combinators

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use undertow::effect::{concurrent_sequence, concurrent_traverse};
use undertow::prelude::*;
use undertow::testing::RecordingScheduler;

fn workers() -> SchedulerRef {
    Arc::new(ThreadScheduler::builder().name("it-worker").build())
}

fn after(ms: u64, value: i32) -> Effect<i32, String> {
    Effect::sleep(Duration::from_millis(ms)).as_value(value)
}

#[test]
fn test_concurrent_map2_takes_the_slower_time() {
    let started = Instant::now();
    let result = after(200, 1)
        .concurrent_map2(after(100, 2), workers(), |a, b| (a, b))
        .run_blocking();

    assert_eq!(result, Ok((1, 2)));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(300));
}

#[test]
fn test_forks_really_run_at_the_same_time() {
    // Each fork waits for the other at a barrier, so this only finishes when
    // both run concurrently.
    let barrier = Arc::new(Barrier::new(2));
    let meet = |n: i32| {
        let barrier = Arc::clone(&barrier);
        Effect::<_, String>::delay(move || {
            barrier.wait();
            n
        })
    };

    let fiber = meet(1)
        .concurrent_tuple(meet(2), workers())
        .run_fiber(workers());
    assert_eq!(fiber.wait_timeout(Duration::from_secs(5)), Some(Ok((1, 2))));
}

#[test]
fn test_concurrent_traverse_preserves_input_order() {
    let delays = vec![50, 10, 40, 0, 20];
    let effect = concurrent_traverse(delays.clone(), workers(), |ms| after(ms, ms as i32));

    let expected: Vec<i32> = delays.iter().map(|&ms| ms as i32).collect();
    assert_eq!(effect.run_blocking(), Ok(expected));
}

#[test]
fn test_concurrent_traverse_submits_in_input_order() {
    let scheduler = Arc::new(RecordingScheduler::new());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let effect = concurrent_traverse(0..5, scheduler.clone(), |n| {
        let order = Arc::clone(&order);
        Effect::<_, String>::delay(move || {
            order.lock().push(n);
            n
        })
    });

    assert_eq!(effect.run_blocking(), Ok(vec![0, 1, 2, 3, 4]));
    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    assert_eq!(scheduler.submitted(), 5);
}

#[test]
fn test_concurrent_sequence_reports_first_failure_in_input_order() {
    let effects = vec![
        after(10, 1),
        after(80, 0).product_r(Effect::fail("slow failure".to_string())),
        Effect::fail("fast failure".to_string()),
    ];
    let result = concurrent_sequence(effects, workers()).run_blocking();
    assert_eq!(result, Err("slow failure".to_string()));
}

#[test]
fn test_start_is_eager_and_join_is_memoized() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let work = Effect::<_, String>::delay(move || counter.fetch_add(1, Ordering::SeqCst));

    let join = work.start(workers()).run_blocking().unwrap();
    let first = join.clone().run_blocking();
    let second = join.run_blocking();

    assert_eq!(first, second);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fiber_bridges_back_into_an_effect() {
    let fiber = after(20, 5).run_fiber(workers());
    let doubled = Effect::from_fiber(&fiber).map(|x| x * 2);

    assert_eq!(doubled.clone().run_blocking(), Ok(10));
    assert_eq!(doubled.run_blocking(), Ok(10));
}

#[test]
fn test_joining_never_blocks_with_bounded_wait() {
    let fiber = Effect::<i32, String>::never().run_fiber(workers());
    assert_eq!(fiber.wait_timeout(Duration::from_millis(100)), None);
    assert!(!fiber.is_completed());
}

#[test]
fn test_panicking_fork_reaches_the_failure_hook() {
    let reported = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&reported);
    let scheduler: SchedulerRef = Arc::new(
        ThreadScheduler::builder()
            .name("panicky")
            .on_failure(move |failure| sink.lock().push(failure))
            .build(),
    );

    let fiber = Effect::<i32, String>::delay(|| panic!("bad fork")).run_fiber(scheduler);

    assert!(catch_unwind(AssertUnwindSafe(|| fiber.wait())).is_err());
    assert_eq!(fiber.panicked().map(|f| f.message().to_string()), Some("bad fork".to_string()));
    let reported = reported.lock();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].message(), "bad fork");
}

#[test]
fn test_panic_in_eval_on_is_reraised_by_run_blocking() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let outcome = catch_unwind(|| {
            Effect::<i32, String>::delay(|| panic!("bug"))
                .eval_on(workers())
                .run_blocking()
        });
        let message = outcome
            .err()
            .and_then(|payload| payload.downcast_ref::<String>().cloned());
        let _ = tx.send(message);
    });

    let message = rx.recv_timeout(Duration::from_secs(5));
    assert_eq!(message, Ok(Some("bug".to_string())));
}

#[test]
fn test_panic_in_one_concurrent_branch_reaches_the_joiner() {
    let outcome = catch_unwind(|| {
        after(20, 1)
            .concurrent_tuple(Effect::delay(|| -> i32 { panic!("right branch") }), workers())
            .run_blocking()
    });
    assert!(outcome.is_err());
}
