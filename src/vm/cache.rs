//! Memoizing executor wrapper.

use super::Executor;
use std::collections::HashMap;
use std::sync::RwLock;

/// Default number of memoized executions before the cache is cleared.
pub const DEFAULT_CACHE_CAPACITY: usize = 1 << 16;

type CacheKey = (String, String, usize);

/// Wraps an executor and memoizes `(source, stdin, max_output_size)` calls.
///
/// The wrapped executor must be deterministic, so a cached output is
/// indistinguishable from a fresh one. The cache is cleared once it holds
/// `capacity` entries.
#[derive(Debug)]
pub struct CachedExecutor<E> {
    inner: E,
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl<E: Executor> CachedExecutor<E> {
    /// Wrap `inner` with the default capacity.
    #[must_use]
    pub fn new(inner: E) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// Wrap `inner`, clearing the cache every `capacity` entries.
    #[must_use]
    pub fn with_capacity(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of memoized executions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// True if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Executor> Executor for CachedExecutor<E> {
    fn execute(&self, source: &str, stdin: &str, max_output_size: usize) -> String {
        let key = (source.to_string(), stdin.to_string(), max_output_size);
        if let Some(output) = self.entries.read().ok().and_then(|entries| entries.get(&key).cloned()) {
            return output;
        }

        let output = self.inner.execute(source, stdin, max_output_size);

        // A poisoned lock only disables memoization.
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.capacity {
                entries.clear();
            }
            entries.insert(key, output.clone());
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::TapeMachine;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Executor for Counting {
        fn execute(&self, source: &str, stdin: &str, _max_output_size: usize) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("{source}|{stdin}")
        }
    }

    #[test]
    fn test_cache_hit() {
        let cached = CachedExecutor::new(Counting::default());
        assert_eq!(cached.execute("+.", "a", 32), "+.|a");
        assert_eq!(cached.execute("+.", "a", 32), "+.|a");
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 1);

        cached.execute("+.", "b", 32);
        assert_eq!(cached.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn test_cache_is_bounded() {
        let cached = CachedExecutor::with_capacity(Counting::default(), 2);
        cached.execute("a", "", 32);
        cached.execute("b", "", 32);
        cached.execute("c", "", 32);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_cache_matches_inner() {
        let machine = TapeMachine::default();
        let cached = CachedExecutor::new(machine);
        for source in ["++++>,<[->+<]>.", "+[.]", ",."] {
            assert_eq!(cached.execute(source, "a", 32), machine.execute(source, "a", 32));
            assert_eq!(cached.execute(source, "a", 32), machine.execute(source, "a", 32));
        }
    }
}
