//! Admission control for concurrently submitted tasks.
//!
//! This library shapes task admission under two policies, both behind a
//! single `execute(task)` contract. A task is an arbitrary unit of work
//! (any `Future<Output = ()>`); a limiter either admits it or rejects it
//! synchronously with an error. Both limiters are thread-safe and
//! designed to be embedded in a larger service.
//!
//! # Quick Start
//!
//! ```rust
//! use admission_guard::limiters::TokenBucketLimiter;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Capacity 100, refilling 10 tokens per second
//! let limiter = TokenBucketLimiter::new(100, 10.0, Duration::from_secs(1));
//!
//! match limiter.execute(async { println!("admitted") }).await {
//!     Ok(()) => {}
//!     Err(e) => println!("rejected: {}", e),
//! }
//! # }
//! ```
//!
//! # Available Policies
//!
//! ## [Token Bucket](limiters::TokenBucketLimiter)
//! Allows bursts up to capacity while maintaining an average rate; an
//! admitted task runs inline on the caller:
//! ```rust
//! # use admission_guard::limiters::TokenBucketLimiter;
//! # use std::time::Duration;
//! let limiter = TokenBucketLimiter::new(10, 5.0, Duration::from_secs(1));
//! ```
//!
//! ## [Leaky Bucket](limiters::LeakyBucketLimiter)
//! Queues tasks and drains them at a strict fixed rate into a bounded
//! worker pool:
//! ```rust
//! # use admission_guard::limiters::LeakyBucketLimiter;
//! # use std::time::Duration;
//! // queue 100 tasks, drain one every 50ms, run up to 8 at once
//! let limiter = LeakyBucketLimiter::new(100, Duration::from_millis(50), 8);
//! ```
//!
//! # Core Concepts
//!
//! ## Tasks
//! A task takes no arguments and produces no value; everything it needs
//! is captured at submission time. The token bucket runs admitted tasks
//! inline on the caller's async task, so task panics propagate to the
//! caller. The leaky bucket dispatches tasks to background workers and
//! contains their panics at the dispatch boundary (see
//! [`with_failure_observer`](limiters::LeakyBucketLimiter::with_failure_observer)).
//!
//! ## Error Handling
//! Admission failures are returned synchronously as [`LimiterError`]:
//! - **[`NoTokensAvailable`](LimiterError::NoTokensAvailable)** - token
//!   bucket exhausted, even after the bounded backoff wait
//! - **[`QueueFull`](LimiterError::QueueFull)** - leaky bucket queue at
//!   capacity
//! - **[`AlreadyStarted`](LimiterError::AlreadyStarted)** - drain loop
//!   already running
//!
//! The limiters never retry or log these; a rejected task never runs and
//! the caller decides whether to retry, drop, or escalate.
//!
//! ## Thread Safety
//! Both limiters are safe under many concurrent callers. The token
//! bucket admits through a lock-free fast path and serializes only its
//! refill computation behind a short-held lock; the leaky bucket guards
//! its queue with a single mutex shared by producers and the drain loop.
//!
//! # Policy Selection Guide
//!
//! - **Allow controlled bursts, run work on the caller**: use
//!   [`TokenBucketLimiter`](limiters::TokenBucketLimiter)
//! - **Strict constant admission rate, run work in the background**: use
//!   [`LeakyBucketLimiter`](limiters::LeakyBucketLimiter)
//!
//! No state is persisted across restarts, and neither policy guarantees
//! execution order of admitted tasks beyond the leaky bucket's FIFO
//! dispatch rule.

pub mod error;
pub mod limiters;
pub mod rate_limiter;
pub mod types;

pub use error::{ExecuteResult, LimiterError};
pub use rate_limiter::RateLimiter;
pub use types::{AtomicUint, Task, Uint};
