//! Structured concurrency for fan-out I/O.
//!
//! - [`cancel::CancellationToken`] - a shared flag observed by every blocking call
//!   within one scope of work.
//! - [`fetch_pool::FetchPool`] - a bounded thread pool dedicated to blocking reads.
//! - [`fork_join::try_for_each`] - runs one task per item on a `FetchPool`, cancels
//!   the remaining tasks on the first failure and returns that failure once every
//!   task has unwound.

pub mod cancel;
pub mod fetch_pool;
pub mod fork_join;

pub use cancel::CancellationToken;
pub use fetch_pool::FetchPool;
pub use fork_join::try_for_each;
