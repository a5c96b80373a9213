use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use admission_guard::limiters::{TokenBucketConfig, TokenBucketLimiter};
use admission_guard::LimiterError;

#[test]
fn test_new_token_bucket() {
    let _ = TokenBucketLimiter::new(100, 10.0, Duration::from_secs(1));
    // Constructor should succeed without panic
}

#[test]
#[should_panic(expected = "capacity must be greater than 0")]
fn test_new_with_zero_capacity() {
    TokenBucketLimiter::new(0, 10.0, Duration::from_secs(1));
}

#[test]
#[should_panic(expected = "fill_rate must be greater than 0")]
fn test_new_with_zero_fill_rate() {
    TokenBucketLimiter::new(100, 0.0, Duration::from_secs(1));
}

#[test]
#[should_panic(expected = "fill_rate must be greater than 0")]
fn test_new_with_non_finite_fill_rate() {
    TokenBucketLimiter::new(100, f64::INFINITY, Duration::from_secs(1));
}

#[test]
#[should_panic(expected = "fill_interval must be non-zero")]
fn test_new_with_zero_fill_interval() {
    TokenBucketLimiter::new(100, 10.0, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_initial_full_bucket() {
    let limiter = TokenBucketLimiter::new(10, 10.0, Duration::from_secs(1));
    let counter = AtomicUsize::new(0);

    // Bucket starts full, so all 10 tasks run inline with no elapsed time
    for _ in 0..10 {
        limiter
            .execute(async {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .await
            .unwrap();
    }

    assert_eq!(counter.load(Ordering::Relaxed), 10);
    // No time has passed, so nothing has refilled
    assert_eq!(limiter.available_tokens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_task_runs_exactly_once() {
    let limiter = TokenBucketLimiter::new(10, 10.0, Duration::from_secs(1));
    let counter = AtomicUsize::new(0);

    limiter
        .execute(async {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .await
        .unwrap();

    assert_eq!(counter.load(Ordering::Relaxed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refill_truncates_fractional_tokens() {
    let limiter = TokenBucketLimiter::new(10, 2.0, Duration::from_secs(1)); // 2 tokens/sec

    // Drain the bucket
    for _ in 0..10 {
        limiter.execute(async {}).await.unwrap();
    }

    // 400ms at 2 tokens/sec = 0.8 tokens, truncated to 0
    tokio::time::advance(Duration::from_millis(400)).await;
    assert_eq!(limiter.available_tokens(), 0);

    // 500ms total = 1.0 tokens, crossing the integer boundary
    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(limiter.available_tokens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refill_capped_at_capacity() {
    let limiter = TokenBucketLimiter::new(5, 100.0, Duration::from_secs(1));

    for _ in 0..5 {
        limiter.execute(async {}).await.unwrap();
    }

    // 10s at 100 tokens/sec would be 1000 tokens; cap is 5
    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(limiter.available_tokens(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_no_tokens_available() {
    // 1 token per minute: the 10ms backoff can never produce a token
    let limiter = TokenBucketLimiter::new(1, 1.0, Duration::from_secs(60))
        .with_backoff(Duration::from_millis(10));
    limiter.execute(async {}).await.unwrap();

    let counter = AtomicUsize::new(0);
    let result = limiter
        .execute(async {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .await;

    assert_eq!(result, Err(LimiterError::NoTokensAvailable));
    // The rejected task never ran
    assert_eq!(counter.load(Ordering::Relaxed), 0);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_wait_then_success() {
    let limiter = TokenBucketLimiter::new(10, 10.0, Duration::from_secs(1));

    for _ in 0..10 {
        limiter.execute(async {}).await.unwrap();
    }

    // The 11th call finds the bucket empty and waits; the 1s backoff
    // window accrues 10 tokens, so it succeeds at the deadline
    let started = tokio::time::Instant::now();
    limiter.execute(async {}).await.unwrap();
    let waited = started.elapsed();

    assert!(
        waited >= Duration::from_millis(900) && waited <= Duration::from_millis(1100),
        "waited {:?}",
        waited
    );
}

#[tokio::test(start_paused = true)]
async fn test_try_execute_does_not_wait() {
    let limiter = TokenBucketLimiter::new(1, 10.0, Duration::from_secs(1));

    limiter.try_execute(async {}).await.unwrap();
    assert_eq!(
        limiter.try_execute(async {}).await,
        Err(LimiterError::NoTokensAvailable)
    );

    // 100ms at 10 tokens/sec = 1 token
    tokio::time::advance(Duration::from_millis(100)).await;
    limiter.try_execute(async {}).await.unwrap();
}

#[tokio::test]
async fn test_task_panic_propagates_to_caller() {
    let limiter = Arc::new(TokenBucketLimiter::new(1, 1.0, Duration::from_secs(1)));

    let limiter_clone = Arc::clone(&limiter);
    let handle = tokio::spawn(async move {
        limiter_clone
            .execute(async { panic!("task body failed") })
            .await
    });

    // Inline execution means the panic surfaces on the caller's task
    assert!(handle.await.unwrap_err().is_panic());
}

#[tokio::test(start_paused = true)]
async fn test_config_conversion() {
    let limiter: TokenBucketLimiter = TokenBucketConfig::new(3, 1.0, Duration::from_secs(1))
        .with_backoff(Duration::from_millis(5))
        .into();

    for _ in 0..3 {
        limiter.execute(async {}).await.unwrap();
    }
    // Backoff of 5ms at 1 token/sec cannot produce a token
    assert_eq!(
        limiter.execute(async {}).await,
        Err(LimiterError::NoTokensAvailable)
    );
}
