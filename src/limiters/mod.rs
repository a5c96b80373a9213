//! Limiter implementations.
//!
//! This module contains both admission policies. Each limiter is a
//! thread-safe, self-contained component exposing the shared
//! [`execute`](crate::RateLimiter::execute) contract.
//!
//! # Available Policies
//!
//! - **[`TokenBucketLimiter`]** - Bursty-but-bounded throughput; tokens
//!   refill continuously and admitted tasks run inline on the caller
//! - **[`LeakyBucketLimiter`]** - Strict queueing; a background ticker
//!   drains one task per tick into a bounded worker pool
//!
//! # Policy Comparison
//!
//! | Policy | Burst Handling | Execution | Rejection |
//! |--------|----------------|-----------|-----------|
//! | Token Bucket | Up to capacity, immediately | Inline, on the caller | After the backoff bound |
//! | Leaky Bucket | Absorbed by the queue | Background worker pool | At submission, queue full |

pub mod token_bucket;
pub use token_bucket::TokenBucketConfig;
pub use token_bucket::TokenBucketLimiter;
pub use token_bucket::DEFAULT_BACKOFF;

pub mod leaky_bucket;
pub use leaky_bucket::FailureObserver;
pub use leaky_bucket::LeakyBucketConfig;
pub use leaky_bucket::LeakyBucketLimiter;
