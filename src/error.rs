//! error.rs
//! Error and result types for limiter operations.

use thiserror::Error;

/// Error type returned by limiter operations.
///
/// Every variant is surfaced synchronously to the caller of the operation
/// that failed. The limiters never retry, log, or otherwise recover from
/// these internally; a rejected task simply never runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LimiterError {
    /// The token bucket had no tokens left, even after a refill attempt
    /// and the bounded backoff wait.
    #[error("no tokens available")]
    NoTokensAvailable,

    /// The leaky bucket's pending queue is at capacity. Raised at
    /// submission time, without blocking.
    #[error("task queue is full")]
    QueueFull,

    /// The leaky bucket's drain loop is already running. `start` never
    /// spawns a second loop.
    #[error("drain loop already started")]
    AlreadyStarted,
}

/// Result type for `execute` and `start` operations.
pub type ExecuteResult = Result<(), LimiterError>;
