//! Retry Patterns Example
//!
//! Demonstrates `retry_once` and `retry_until_success` against a service
//! that fails a fixed number of times before answering.
//!
//! Run with: cargo run --example retry_patterns

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use undertow::Effect;

#[derive(Debug, Clone, PartialEq)]
enum ServiceError {
    Unavailable { attempt: u32 },
}

/// A call that fails until its `healthy_after`-th attempt.
fn flaky_service(healthy_after: u32) -> Effect<String, ServiceError> {
    let attempts = Arc::new(AtomicU32::new(0));
    Effect::from_fn(move || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        println!("   attempt {}", attempt);
        if attempt < healthy_after {
            Err(ServiceError::Unavailable { attempt })
        } else {
            Ok(format!("answered on attempt {}", attempt))
        }
    })
}

fn main() {
    // Retries are logged at debug level.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Retry Patterns Demo ===\n");

    println!("1. retry_once on a service that fails once:");
    let result = flaky_service(2).retry_once().run_blocking();
    println!("   Result: {:?}\n", result);

    println!("2. retry_once on a service that fails three times:");
    let result = flaky_service(4).retry_once().run_blocking();
    println!("   Result: {:?}\n", result);

    println!("3. retry_until_success with a 100ms delay:");
    let started = Instant::now();
    let result = flaky_service(4)
        .retry_until_success(Duration::from_millis(100))
        .run_blocking();
    println!("   Result: {:?} in {:?}\n", result, started.elapsed());

    println!("4. Recovering after retries are exhausted:");
    let result = flaky_service(10)
        .retry_once()
        .handle_error_with(|ServiceError::Unavailable { attempt }| {
            Effect::succeed(format!("fallback after {} attempts", attempt))
        })
        .run_blocking();
    println!("   Result: {:?}", result);
}
