//! Core trait for admission-controlled task execution.
//!
//! This module defines the unified trait implemented by both limiters.
//! It allows consumers to pick an admission policy per resource while
//! programming against a single `execute` contract.

use async_trait::async_trait;

use crate::{ExecuteResult, Task};

/// The core trait implemented by all limiters.
///
/// A limiter either admits the task (running it inline or queueing it for
/// background dispatch, depending on the policy) or rejects it with a
/// [`LimiterError`](crate::LimiterError). Both limiters also expose
/// inherent `execute` methods generic over the task's future type; this
/// trait is the object-safe seam for callers that select a policy at
/// runtime.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Submits a task for admission-controlled execution.
    ///
    /// # Arguments
    /// * `task` - The unit of work to admit
    ///
    /// # Returns
    /// * `Ok(())` if the task was admitted
    /// * `Err(LimiterError)` if it was rejected; the task never runs
    async fn execute(&self, task: Task) -> ExecuteResult;
}
