//! Bounded worker pool for batched, independent evaluations.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use opt_types::{OptError, OptResult};

/// Fixed-size pool. Output order always matches input order, whatever order
/// the tasks finish in.
pub struct ParallelExecutor {
    workers: usize,
    pool: ThreadPool,
}

impl ParallelExecutor {
    pub fn new(workers: usize) -> OptResult<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("opt-worker-{i}"))
            .build()
            .map_err(|e| OptError::Internal(format!("failed to build worker pool: {e}")))?;
        Ok(Self { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` over every input and wait for all of them. The first error
    /// fails the whole batch.
    pub fn try_map<T, R, F>(&self, inputs: &[T], task: F) -> OptResult<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> OptResult<R> + Sync + Send,
    {
        debug!("Dispatching {} tasks to {} workers", inputs.len(), self.workers);
        self.pool
            .install(|| inputs.par_iter().map(|input| task(input)).collect())
    }
}

impl std::fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("workers", &self.workers)
            .finish()
    }
}
