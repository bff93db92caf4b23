//! Thread pool for blocking range fetches.

use std::sync::{Arc, OnceLock};

use tsblock_common::{Result, error::Error};

/// A fixed-size thread pool dedicated to blocking object-storage reads.
///
/// Fetch tasks spend most of their time waiting on storage latency, so the pool
/// is sized independently of the number of cores.
pub struct FetchPool {
    thread_pool: rayon::ThreadPool,
}

impl FetchPool {
    /// Number of threads in the global pool.
    pub const DEFAULT_NUM_THREADS: usize = 16;

    /// Returns the global shared instance of the `FetchPool`.
    ///
    /// The pool is lazily initialized on first call and shared across the application.
    pub fn global() -> Arc<FetchPool> {
        static POOL: OnceLock<Arc<FetchPool>> = OnceLock::new();
        POOL.get_or_init(|| {
            // Only fails when the OS refuses to spawn threads; there is no pool to fall back to.
            Arc::new(FetchPool::new(Self::DEFAULT_NUM_THREADS).expect("global fetch pool"))
        })
        .clone()
    }

    /// Creates a dedicated pool with `num_threads` worker threads.
    pub fn new(num_threads: usize) -> Result<FetchPool> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|i| format!("tsblock_fetch_{i}"))
            .build()
            .map_err(|e| Error::io("build fetch pool", std::io::Error::other(e)))?;
        Ok(FetchPool { thread_pool })
    }

    pub fn num_threads(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    /// Provides access to the underlying thread pool.
    pub fn thread_pool(&self) -> &rayon::ThreadPool {
        &self.thread_pool
    }
}
