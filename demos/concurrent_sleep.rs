//! Concurrent Sleep Example
//!
//! Demonstrates the difference between sequential `map2` and forked
//! `concurrent_map2`, and shows which threads each part runs on.
//!
//! Run with: cargo run --example concurrent_sleep

use std::sync::Arc;
use std::time::{Duration, Instant};

use undertow::console::{print_line, thread_name};
use undertow::prelude::*;

// ============================================================================
// Building blocks
// ============================================================================

/// Sleep for `ms`, then report which thread woke up.
fn nap(label: &'static str, ms: u64) -> Effect<String, String> {
    Effect::sleep(Duration::from_millis(ms))
        .product_r(thread_name())
        .flat_map(move |thread| {
            print_line(format!("   {} finished on {}", label, thread)).as_value(label.to_string())
        })
}

fn timed<A: Send + 'static>(effect: Effect<A, String>) -> (Result<A, String>, Duration) {
    let started = Instant::now();
    let result = effect.run_blocking();
    (result, started.elapsed())
}

fn main() {
    println!("=== Concurrent Sleep Demo ===\n");

    let workers: SchedulerRef = Arc::new(ThreadScheduler::builder().name("demo").build());

    // Sequential: the second nap starts after the first one ends
    println!("1. map2 (sequential):");
    let (result, elapsed) = timed(nap("left", 300).map2(nap("right", 300), |a, b| a + "+" + &b));
    println!("   Result: {:?} in {:?}\n", result, elapsed);

    // Concurrent: both naps are forked before either is joined
    println!("2. concurrent_map2 (forked):");
    let (result, elapsed) = timed(nap("left", 300).concurrent_map2(
        nap("right", 300),
        Arc::clone(&workers),
        |a, b| a + "+" + &b,
    ));
    println!("   Result: {:?} in {:?}\n", result, elapsed);

    // Many forks, results in input order
    println!("3. concurrent_traverse (input order kept):");
    let naps = vec![("slow", 300), ("quick", 50), ("medium", 150)];
    let (result, elapsed) = timed(concurrent_traverse(naps, workers, |(label, ms)| {
        nap(label, ms)
    }));
    println!("   Result: {:?} in {:?}", result, elapsed);
}
