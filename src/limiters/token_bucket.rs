use std::future::Future;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::rate_limiter::RateLimiter;
use crate::{AtomicUint, ExecuteResult, LimiterError, Task, Uint};

/// Default bound on how long an `execute` call waits for a refill before
/// giving up with [`LimiterError::NoTokensAvailable`].
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Admission control with the token bucket algorithm.
///
/// The bucket holds a capacity-bounded token count that refills lazily
/// based on elapsed wall-clock time. Each admitted task consumes one
/// token and runs inline on the caller's async task. Unused tokens
/// accumulate up to the capacity, so bursts up to `capacity` are admitted
/// immediately while the average rate stays at the fill rate.
///
/// # Algorithm Behavior
///
/// - The bucket starts full with `capacity` tokens
/// - A caller with a token available consumes it via a single
///   compare-and-swap and runs its task immediately (the lock-free fast
///   path)
/// - A caller that finds the bucket empty, or loses the CAS race, takes
///   the slow path: a short critical section recomputes the refill, then
///   the caller waits up to the backoff bound for a token
/// - A caller still without a token at the backoff deadline is rejected
///   and its task never runs
///
/// Refill is quantized: tokens accrue as `floor(elapsed × rate)`, so
/// fractional accumulation below one token is invisible until enough time
/// has passed to cross an integer boundary.
///
/// # Example
///
/// ```rust
/// use admission_guard::limiters::TokenBucketLimiter;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// // 10 tokens, refilling at 10 tokens per second
/// let limiter = TokenBucketLimiter::new(10, 10.0, Duration::from_secs(1));
///
/// match limiter.execute(async { /* admitted work */ }).await {
///     Ok(()) => {}
///     Err(e) => println!("rejected: {}", e),
/// }
/// # }
/// ```
pub struct TokenBucketLimiter {
    /// Maximum number of tokens the bucket can hold
    capacity: Uint,
    /// Tokens added per elapsed millisecond
    fill_rate_per_milli: f64,
    /// Upper bound on how long a caller waits for a refill
    backoff: Duration,
    /// Current number of tokens available in the bucket
    tokens: AtomicUint,
    /// Refill bookkeeping, serialized so racing callers do not compute
    /// the same refill twice
    refill: Mutex<RefillState>,
    /// Woken whenever a refill adds tokens, releasing bounded waiters
    refilled: Notify,
}

/// Refill bookkeeping behind the slow-path lock.
struct RefillState {
    /// Instant of the last refill that actually added tokens
    last_refill: Instant,
}

impl TokenBucketLimiter {
    /// Creates a new token bucket with the specified parameters.
    ///
    /// `fill_rate` tokens are added per `fill_interval`; "10 tokens per
    /// second" is `new(capacity, 10.0, Duration::from_secs(1))`. The
    /// bucket starts full. The backoff bound defaults to
    /// [`DEFAULT_BACKOFF`]; see [`with_backoff`](Self::with_backoff).
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, `fill_rate` is not a positive finite
    /// number, or `fill_interval` is zero.
    pub fn new(capacity: Uint, fill_rate: f64, fill_interval: Duration) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        assert!(
            fill_rate > 0.0 && fill_rate.is_finite(),
            "fill_rate must be greater than 0"
        );
        assert!(!fill_interval.is_zero(), "fill_interval must be non-zero");

        TokenBucketLimiter {
            capacity,
            fill_rate_per_milli: fill_rate / (fill_interval.as_secs_f64() * 1000.0),
            backoff: DEFAULT_BACKOFF,
            tokens: AtomicUint::new(capacity), // bucket starts full
            refill: Mutex::new(RefillState {
                last_refill: Instant::now(),
            }),
            refilled: Notify::new(),
        }
    }

    /// Sets the bound on how long an `execute` call waits for a refill.
    ///
    /// A waiter woken by a refill proceeds as soon as it wins a token; the
    /// bound is a worst case, not a fixed delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Runs `task` inline once a token has been acquired.
    ///
    /// Fast path: a single compare-and-decrement admits the task with no
    /// locking. Otherwise the caller recomputes the refill and waits up to
    /// the backoff bound for a token, then either runs the task or fails
    /// with [`LimiterError::NoTokensAvailable`].
    ///
    /// The task runs on the caller's own async task, so a panic in the
    /// task body propagates to the caller on every admission path.
    pub async fn execute<F>(&self, task: F) -> ExecuteResult
    where
        F: Future<Output = ()>,
    {
        self.acquire().await?;
        task.await;
        Ok(())
    }

    /// Runs `task` inline if a token is available right now.
    ///
    /// Like [`execute`](Self::execute) but without the backoff wait: one
    /// fast-path attempt plus a refill recomputation, then admission or
    /// [`LimiterError::NoTokensAvailable`].
    pub async fn try_execute<F>(&self, task: F) -> ExecuteResult
    where
        F: Future<Output = ()>,
    {
        if !self.try_consume() {
            self.refill();
            if !self.try_consume() {
                return Err(LimiterError::NoTokensAvailable);
            }
        }
        task.await;
        Ok(())
    }

    /// Gets the current number of tokens in the bucket.
    ///
    /// Recomputes the refill first, so the returned count reflects the
    /// tokens accrued up to now.
    pub fn available_tokens(&self) -> Uint {
        self.refill();
        self.tokens.load(Ordering::Relaxed)
    }

    /// Acquires one token, waiting at most `backoff` for a refill.
    async fn acquire(&self) -> ExecuteResult {
        // Fast path: one compare-and-decrement attempt. A lost race falls
        // through to the slow path instead of retrying here.
        let snapshot = self.tokens.load(Ordering::Relaxed);
        if snapshot > 0
            && self
                .tokens
                .compare_exchange(snapshot, snapshot - 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            return Ok(());
        }

        // Slow path: recompute the refill, then wait out at most the
        // backoff bound, woken early whenever a refill adds tokens.
        let deadline = Instant::now() + self.backoff;
        loop {
            self.refill();
            if self.try_consume() {
                return Ok(());
            }

            tokio::select! {
                _ = self.refilled.notified() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    // One final attempt at the deadline: the wait itself
                    // may have accrued enough time to cross a token
                    // boundary.
                    self.refill();
                    if self.try_consume() {
                        return Ok(());
                    }
                    return Err(LimiterError::NoTokensAvailable);
                }
            }
        }
    }

    /// Consumes one token if any are available.
    fn try_consume(&self) -> bool {
        let mut available = self.tokens.load(Ordering::Relaxed);
        while available > 0 {
            match self.tokens.compare_exchange_weak(
                available,
                available - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => available = actual,
            }
        }
        false
    }

    /// Adds the tokens accrued since the last refill, capped at capacity.
    ///
    /// The critical section covers only the timestamp read and the token
    /// arithmetic. `last_refill` moves forward only when at least one
    /// whole token accrued, so fractional accumulation is preserved
    /// across calls.
    fn refill(&self) {
        let mut state = self.refill.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        let addable = (elapsed.as_millis() as f64 * self.fill_rate_per_milli) as Uint;
        if addable == 0 {
            return;
        }

        let mut current = self.tokens.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_add(addable).min(self.capacity);
            match self
                .tokens
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        state.last_refill = now;
        drop(state);

        tracing::trace!(added = addable, "refilled token bucket");
        self.refilled.notify_waiters();
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    /// Submits a task for admission-controlled inline execution.
    ///
    /// This method is a wrapper around the inherent
    /// [`execute`](TokenBucketLimiter::execute).
    async fn execute(&self, task: Task) -> ExecuteResult {
        self.execute(task).await
    }
}

/// Configuration structure for creating a `TokenBucketLimiter`.
#[derive(Debug, Clone)]
pub struct TokenBucketConfig {
    /// Maximum number of tokens the bucket can hold.
    pub capacity: Uint,
    /// Tokens added per `fill_interval`.
    pub fill_rate: f64,
    /// Time span over which `fill_rate` tokens accrue.
    pub fill_interval: Duration,
    /// Bound on how long a caller waits for a refill.
    pub backoff: Duration,
}

impl TokenBucketConfig {
    /// Creates a new configuration instance with the default backoff.
    pub fn new(capacity: Uint, fill_rate: f64, fill_interval: Duration) -> Self {
        Self {
            capacity,
            fill_rate,
            fill_interval,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Sets the backoff bound.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

impl From<TokenBucketConfig> for TokenBucketLimiter {
    /// Converts a `TokenBucketConfig` into a `TokenBucketLimiter`.
    ///
    /// # Panics
    /// Panics if any field in the config is invalid, as
    /// [`TokenBucketLimiter::new`] does. Intended for validated or
    /// hardcoded input.
    fn from(config: TokenBucketConfig) -> Self {
        TokenBucketLimiter::new(config.capacity, config.fill_rate, config.fill_interval)
            .with_backoff(config.backoff)
    }
}
