//! Rate-limited acquisition through the configured provider.
//!
//! This module provides:
//! - [`AcquisitionPipeline`]: single and batch entry points, bound to one provider
//! - [`RateLimiter`]: the token bucket every request passes through
//! - [`BatchReceiver`] / [`BatchSummary`]: the sink side of a concurrent batch
//!
//! # Batches
//!
//! A batch runs under a supervisor task. Providers with native batching get
//! the whole ticker set in one call behind a single permit; otherwise each
//! ticker gets its own worker task which waits for its own permit. Workers
//! write into a shared bounded channel, and the supervisor releases the last
//! sender only after all workers have been joined, so the channel closing is
//! the completion signal.

mod acquisition;
mod rate_limiter;

pub use acquisition::{AcquisitionPipeline, BatchReceiver, BatchSummary};
pub use rate_limiter::RateLimiter;
