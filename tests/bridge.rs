//! Integration tests for the callback, fiber and future bridges

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use undertow::scheduler::{immediate, ThreadScheduler};
use undertow::{Callback, Effect, Fiber, Promise};

#[test]
fn test_async_completed_from_a_foreign_thread() {
    let effect = Effect::<u32, String>::async_on(immediate(), |callback| {
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            callback.succeed(7);
        });
    });
    assert_eq!(effect.map(|x| x + 1).run_blocking(), Ok(8));
}

#[test]
fn test_run_with_delivers_exactly_once() {
    let (tx, rx) = mpsc::channel();
    Effect::<_, String>::succeed("once").run_with(Callback::new(move |outcome| {
        tx.send(outcome).unwrap();
    }));

    assert_eq!(rx.recv().unwrap(), Ok("once"));
    assert!(rx.recv_timeout(Duration::from_millis(20)).is_err());
}

#[test]
fn test_promise_feeds_an_effect() {
    let promise = Arc::new(Promise::<Result<i32, String>>::new());
    let source = Arc::clone(&promise);
    let effect = Effect::async_on(immediate(), move |callback: Callback<i32, String>| {
        source.subscribe(move |outcome| callback.complete(outcome.clone()))
    });

    let fiber = effect.run_fiber(Arc::new(ThreadScheduler::new()));
    assert_eq!(fiber.wait_timeout(Duration::from_millis(20)), None);

    promise.complete(Ok(11)).unwrap();
    assert_eq!(fiber.wait(), Ok(11));
}

#[test]
fn test_fiber_completed_by_hand() {
    let fiber = Fiber::<String, String>::pending();
    let joined = fiber.join().map(|s| s.to_uppercase());

    let waiter = thread::spawn(move || joined.run_blocking());
    thread::sleep(Duration::from_millis(10));
    fiber.complete(Ok("ready".to_string())).unwrap();

    assert_eq!(waiter.join().unwrap(), Ok("READY".to_string()));
}

#[tokio::test]
async fn test_run_async_inside_tokio() {
    let effect = Effect::<(), String>::sleep(Duration::from_millis(10))
        .product_r(Effect::succeed(3))
        .map(|x| x * 3);
    assert_eq!(effect.run_async().await, Ok(9));
}

#[tokio::test]
async fn test_run_async_reports_failure() {
    let effect = Effect::<i32, _>::fail("nope".to_string());
    assert_eq!(effect.run_async().await, Err("nope".to_string()));
}

#[cfg(feature = "async")]
mod tokio_scheduler {
    use super::*;
    use undertow::scheduler::TokioScheduler;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_map2_on_tokio_blocking_pool() {
        let scheduler = Arc::new(TokioScheduler::current());
        let slow = |n: i32| Effect::<(), String>::sleep(Duration::from_millis(80)).as_value(n);

        let started = std::time::Instant::now();
        let sum = slow(1)
            .concurrent_map2(slow(2), scheduler, |a, b| a + b)
            .run_async()
            .await;

        assert_eq!(sum, Ok(3));
        assert!(started.elapsed() < Duration::from_millis(150));
    }
}
