//! types.rs
//! Shared type aliases for limiter internals and submitted tasks.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;

/// Alias for the atomic counter type used in limiter internals.
///
/// Currently maps to [`AtomicU64`] but may change in future versions
/// to support different architectures or requirements.
pub type AtomicUint = AtomicU64;

/// Alias for the basic unsigned integer type used for token counts and
/// capacities.
///
/// Currently maps to [`u64`], which is large enough for any realistic
/// bucket capacity.
pub type Uint = u64;

/// A unit of work submitted to a limiter.
///
/// Tasks take no arguments and produce no value; everything they need is
/// captured at submission time. The `Send + 'static` bounds allow the
/// leaky bucket to hand tasks to its worker pool.
pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
