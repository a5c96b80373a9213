use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::rate_limiter::RateLimiter;
use crate::{ExecuteResult, LimiterError, Task};

/// Callback invoked with the panic payload of a dispatched task.
///
/// See [`LeakyBucketLimiter::with_failure_observer`].
pub type FailureObserver = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;

/// Admission control with the leaky bucket algorithm.
///
/// Submitted tasks join a bounded FIFO queue. A background drain loop,
/// launched with [`start`](Self::start), removes at most one task per
/// tick and hands it to a bounded worker pool, so tasks are admitted at a
/// strict maximum rate of one per `tick_interval` regardless of how long
/// individual tasks take. A submission that would overflow the queue is
/// rejected immediately.
///
/// # Algorithm Behavior
///
/// - `execute` enqueues at the tail without blocking, or fails with
///   [`LimiterError::QueueFull`]
/// - Each tick dequeues at most one task from the head and dispatches it
///   for asynchronous execution; the drain loop never waits for task
///   completion
/// - Dispatch order is strictly FIFO by enqueue order; completion order
///   is not guaranteed when the pool has more than one worker
/// - Task panics are contained at the dispatch boundary: routed to the
///   failure observer if one is installed, otherwise dropped
///
/// The drain loop is owned by the limiter instance:
/// [`shutdown`](Self::shutdown) cancels it, and dropping the limiter does
/// the same.
///
/// # Example
///
/// ```rust
/// use admission_guard::limiters::LeakyBucketLimiter;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// // queue up to 10 tasks, drain one every 10ms, run up to 4 at once
/// let limiter = LeakyBucketLimiter::new(10, Duration::from_millis(10), 4);
///
/// limiter.execute(async { /* queued work */ }).unwrap();
/// limiter.start().unwrap();
/// # tokio::time::sleep(Duration::from_millis(50)).await;
/// # }
/// ```
pub struct LeakyBucketLimiter {
    /// Pending tasks, FIFO; length never exceeds `max_queue_size`
    queue: Arc<Mutex<VecDeque<Task>>>,
    /// Maximum number of queued tasks
    max_queue_size: usize,
    /// Duration between drain attempts
    tick_interval: Duration,
    /// Permits bounding how many dispatched tasks run concurrently
    workers: Arc<Semaphore>,
    /// Optional observer for panics escaping dispatched tasks
    failure_observer: Option<FailureObserver>,
    /// Handle of the running drain loop, if started
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl LeakyBucketLimiter {
    /// Creates a new leaky bucket with the specified parameters.
    ///
    /// `worker_pool_size` bounds how many dequeued tasks may run
    /// concurrently; dispatches beyond the bound wait for a free worker
    /// without ever stalling the drain loop.
    ///
    /// # Panics
    ///
    /// Panics if `max_queue_size` or `worker_pool_size` is zero, or if
    /// `tick_interval` is zero.
    pub fn new(max_queue_size: usize, tick_interval: Duration, worker_pool_size: usize) -> Self {
        assert!(max_queue_size > 0, "max_queue_size must be greater than 0");
        assert!(!tick_interval.is_zero(), "tick_interval must be non-zero");
        assert!(
            worker_pool_size > 0,
            "worker_pool_size must be greater than 0"
        );

        LeakyBucketLimiter {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(max_queue_size))),
            max_queue_size,
            tick_interval,
            workers: Arc::new(Semaphore::new(worker_pool_size)),
            failure_observer: None,
            drain: Mutex::new(None),
        }
    }

    /// Installs an observer for panics escaping dispatched tasks.
    ///
    /// Without an observer the limiter keeps fire-and-forget semantics: a
    /// panicking task is contained at the dispatch boundary and its
    /// payload dropped. Install before calling [`start`](Self::start);
    /// the drain loop captures the observer when it launches.
    pub fn with_failure_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(Box<dyn Any + Send>) + Send + Sync + 'static,
    {
        self.failure_observer = Some(Arc::new(observer));
        self
    }

    /// Enqueues `task` at the tail of the pending queue.
    ///
    /// Never blocks and never runs the task itself. Fails with
    /// [`LimiterError::QueueFull`] when the queue is at capacity.
    pub fn execute<F>(&self, task: F) -> ExecuteResult
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.enqueue(Box::pin(task))
    }

    /// Launches the background drain loop on the current Tokio runtime.
    ///
    /// The first drain attempt happens immediately; each subsequent
    /// attempt is scheduled `tick_interval` after the previous tick
    /// began, so the cadence is wall-clock-paced rather than work-paced.
    ///
    /// Calling `start` while the loop is already running fails with
    /// [`LimiterError::AlreadyStarted`]; a second loop is never spawned.
    /// After [`shutdown`](Self::shutdown) the limiter may be started
    /// again.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&self) -> ExecuteResult {
        let mut drain = self.drain.lock();
        if drain.is_some() {
            return Err(LimiterError::AlreadyStarted);
        }

        let queue = Arc::clone(&self.queue);
        let workers = Arc::clone(&self.workers);
        let observer = self.failure_observer.clone();
        let tick_interval = self.tick_interval;

        *drain = Some(tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            // Pace from each tick's start, never from task completion.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let task = queue.lock().pop_front();
                if let Some(task) = task {
                    tracing::trace!("dispatching queued task");
                    dispatch(task, Arc::clone(&workers), observer.clone());
                }
            }
        }));

        tracing::debug!("drain loop started");
        Ok(())
    }

    /// Cancels the drain loop.
    ///
    /// Queued tasks that were never dispatched simply never run; tasks
    /// already handed to workers keep running. Idempotent, and also
    /// invoked on drop so the loop's lifetime is tied to the limiter
    /// instance.
    pub fn shutdown(&self) {
        if let Some(handle) = self.drain.lock().take() {
            handle.abort();
            tracing::debug!("drain loop stopped");
        }
    }

    /// Gets the current number of pending tasks.
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    fn enqueue(&self, task: Task) -> ExecuteResult {
        let mut queue = self.queue.lock();
        if queue.len() >= self.max_queue_size {
            return Err(LimiterError::QueueFull);
        }
        queue.push_back(task);
        Ok(())
    }
}

/// Hands a dequeued task to the worker pool.
///
/// The pool bound applies to execution, not dispatch: the worker waits
/// for a permit inside its own spawned task, so the drain loop returns
/// immediately no matter how saturated the pool is.
fn dispatch(task: Task, workers: Arc<Semaphore>, observer: Option<FailureObserver>) {
    tokio::spawn(async move {
        let Ok(_permit) = workers.acquire_owned().await else {
            return;
        };
        if let Err(payload) = AssertUnwindSafe(task).catch_unwind().await {
            match observer {
                Some(observe) => observe(payload),
                None => tracing::debug!("dispatched task panicked; payload dropped"),
            }
        }
    });
}

impl Drop for LeakyBucketLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl RateLimiter for LeakyBucketLimiter {
    /// Submits a task to the pending queue.
    ///
    /// This method is a wrapper around the inherent
    /// [`execute`](LeakyBucketLimiter::execute); it completes immediately
    /// whether or not the task was admitted.
    async fn execute(&self, task: Task) -> ExecuteResult {
        self.enqueue(task)
    }
}

/// Configuration structure for creating a `LeakyBucketLimiter`.
#[derive(Debug, Clone)]
pub struct LeakyBucketConfig {
    /// Maximum number of queued tasks.
    pub max_queue_size: usize,
    /// Duration between drain attempts.
    pub tick_interval: Duration,
    /// Bound on concurrently running dispatched tasks.
    pub worker_pool_size: usize,
}

impl LeakyBucketConfig {
    /// Creates a new configuration instance.
    pub fn new(max_queue_size: usize, tick_interval: Duration, worker_pool_size: usize) -> Self {
        Self {
            max_queue_size,
            tick_interval,
            worker_pool_size,
        }
    }
}

impl From<LeakyBucketConfig> for LeakyBucketLimiter {
    /// Converts a `LeakyBucketConfig` into a `LeakyBucketLimiter`.
    ///
    /// # Panics
    /// Panics if any field in the config is invalid, as
    /// [`LeakyBucketLimiter::new`] does. Intended for validated or
    /// hardcoded input.
    fn from(config: LeakyBucketConfig) -> Self {
        LeakyBucketLimiter::new(
            config.max_queue_size,
            config.tick_interval,
            config.worker_pool_size,
        )
    }
}
