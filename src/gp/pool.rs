//! Bounded worker pool for the scoring phase.
//!
//! Scoring is the only parallel work of a generation. The pool runs a
//! synchronous parallel map on a dedicated rayon pool and rebuilds that pool
//! after a bounded number of tasks, recycling the workers.

use crate::error::{EvoError, Result};
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

/// Worker pool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads.
    pub threads: usize,
    /// Tasks each worker runs before the pool is rebuilt.
    pub tasks_per_worker: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            threads: 16,
            tasks_per_worker: 32,
        }
    }
}

impl PoolConfig {
    /// Tasks run by the whole pool between two rebuilds.
    #[must_use]
    pub fn recycle_after(&self) -> usize {
        self.threads.saturating_mul(self.tasks_per_worker)
    }
}

/// A rayon pool that recycles its workers.
#[derive(Debug)]
pub struct ScoringPool {
    config: PoolConfig,
    pool: ThreadPool,
    tasks: usize,
    rebuilds: usize,
}

impl ScoringPool {
    /// Build the pool.
    ///
    /// # Errors
    ///
    /// Returns an error for zero threads or zero tasks per worker, or if
    /// rayon cannot spawn the workers.
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.threads == 0 || config.tasks_per_worker == 0 {
            return Err(EvoError::InvalidSettings(format!(
                "pool needs at least one thread and one task per worker, got {config:?}"
            )));
        }
        Ok(Self {
            config,
            pool: build(config.threads)?,
            tasks: 0,
            rebuilds: 0,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.config.threads
    }

    /// Number of times the workers were recycled.
    #[must_use]
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Apply `f` to every item in parallel and return the results in input
    /// order.
    ///
    /// Blocks until every item is done.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool has to be rebuilt and rayon fails.
    pub fn map<T, U, F>(&mut self, items: &[T], f: F) -> Result<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        if self.tasks >= self.config.recycle_after() {
            debug!("recycling {} scoring workers after {} tasks", self.config.threads, self.tasks);
            self.pool = build(self.config.threads)?;
            self.tasks = 0;
            self.rebuilds += 1;
        }
        self.tasks += items.len();
        Ok(self.pool.install(|| items.par_iter().map(f).collect()))
    }
}

fn build(threads: usize) -> Result<ThreadPool> {
    Ok(ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("evotape-score-{i}"))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_order() {
        let mut pool = ScoringPool::new(PoolConfig {
            threads: 4,
            tasks_per_worker: 8,
        })
        .unwrap();
        let items: Vec<u32> = (0..100).collect();
        let doubled = pool.map(&items, |x| x * 2).unwrap();
        assert_eq!(doubled, items.iter().map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_workers_are_recycled() {
        let mut pool = ScoringPool::new(PoolConfig {
            threads: 2,
            tasks_per_worker: 5,
        })
        .unwrap();
        let items = vec![1u8; 6];
        pool.map(&items, |x| *x).unwrap();
        pool.map(&items, |x| *x).unwrap();
        assert_eq!(pool.rebuilds(), 0);
        pool.map(&items, |x| *x).unwrap();
        assert_eq!(pool.rebuilds(), 1);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = PoolConfig {
            threads: 0,
            ..PoolConfig::default()
        };
        assert!(matches!(ScoringPool::new(config), Err(EvoError::InvalidSettings(_))));
    }
}
