//! Async Bridge Example
//!
//! Demonstrates running effects from async code: awaiting an effect with
//! `run_async`, scheduling work on tokio's blocking pool with
//! `TokioScheduler`, and bridging a started `Fiber` back into an effect.
//!
//! Run with: cargo run --example async_bridge --features async

use std::sync::Arc;
use std::time::Duration;

use undertow::console::thread_name;
use undertow::scheduler::TokioScheduler;
use undertow::{Effect, SchedulerRef};

#[tokio::main]
async fn main() {
    println!("=== Async Bridge Demo ===\n");

    let blocking_pool: SchedulerRef = Arc::new(TokioScheduler::current());

    // Await a plain effect
    println!("1. run_async:");
    let answer = Effect::<_, String>::delay(|| 6 * 7).run_async().await;
    println!("   Result: {:?}\n", answer);

    // Shift the whole effect onto tokio's blocking pool
    println!("2. eval_on(TokioScheduler):");
    let name = thread_name::<String>()
        .eval_on(Arc::clone(&blocking_pool))
        .run_async()
        .await;
    println!("   Ran on: {:?}\n", name);

    // Start now, join later
    println!("3. run_fiber + from_fiber:");
    let fiber = Effect::<(), String>::sleep(Duration::from_millis(100))
        .as_value("warmed up")
        .run_fiber(blocking_pool);
    println!("   fiber completed yet? {}", fiber.is_completed());
    let joined = Effect::from_fiber(&fiber).map(str::len).run_async().await;
    println!("   Joined: {:?}", joined);
}
