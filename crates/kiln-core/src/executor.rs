//! Bounded worker pool for per-document work.

use kiln_config::Config;
use rayon::prelude::*;

/// Number of workers the host can run in parallel (at least 1).
#[must_use]
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Resolve the worker count for a configured value.
///
/// - `None` uses every available core
/// - `Some(n)` is clamped to `[1, cores]`: configuration can lower the count
///   but never raise it past the host's parallelism
#[must_use]
pub fn effective_workers(requested: Option<usize>) -> usize {
    let cores = available_workers();
    requested.map_or(cores, |n| n.clamp(1, cores))
}

/// Fixed-size worker pool.
///
/// Each dispatch blocks until all work finishes or an error is observed.
/// Every item is handed to the callback at most once. When several callbacks
/// fail, which error is returned is unspecified, but one is always returned.
pub struct Executor {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl Executor {
    /// Create a pool with exactly `workers` threads (0 is treated as 1).
    ///
    /// # Errors
    ///
    /// Returns an error if the threads cannot be spawned.
    pub fn new(workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("kiln-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    /// Create a pool sized by `[concurrency] workers`.
    ///
    /// # Errors
    ///
    /// Returns an error if the threads cannot be spawned.
    pub fn from_config(config: &Config) -> Result<Self, rayon::ThreadPoolBuildError> {
        Self::new(effective_workers(config.concurrency.workers))
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item.
    ///
    /// Items are shared between workers, so anything `f` changes needs its
    /// own synchronization.
    ///
    /// # Errors
    ///
    /// Returns an error returned by `f`. Remaining items may be skipped once
    /// an error is observed.
    pub fn for_each<T, E, F>(&self, items: &[T], f: F) -> Result<(), E>
    where
        T: Sync,
        E: Send,
        F: Fn(&T) -> Result<(), E> + Sync + Send,
    {
        if items.is_empty() {
            return Ok(());
        }
        self.pool.install(|| items.par_iter().try_for_each(f))
    }

    /// Map every item through `f`, keeping input order in the output.
    ///
    /// # Errors
    ///
    /// Returns an error returned by `f`.
    pub fn map<T, R, E, F>(&self, items: &[T], f: F) -> Result<Vec<R>, E>
    where
        T: Sync,
        R: Send,
        E: Send,
        F: Fn(&T) -> Result<R, E> + Sync + Send,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.pool.install(|| items.par_iter().map(f).collect())
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
