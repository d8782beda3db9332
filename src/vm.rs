//! Genome execution: the boundary between the search and the program runner.
//!
//! The search only needs a deterministic function from `(source, stdin)` to
//! an output string. [`TapeMachine`] is the reference implementation and
//! [`CachedExecutor`] memoizes any executor.

mod cache;
mod tape;

pub use cache::{CachedExecutor, DEFAULT_CACHE_CAPACITY};
pub use tape::{DEFAULT_INSTRUCTION_BUDGET, TAPE_SIZE, TapeConfig, TapeMachine};

/// Runs a program and returns what it printed.
///
/// Implementations must be deterministic for identical arguments and must
/// never fail: a misbehaving program yields a (possibly empty) output. The
/// output holds at most `max_output_size - 1` characters, trailing NUL
/// characters removed.
pub trait Executor: Send + Sync {
    /// Execute `source` with `stdin` as input.
    fn execute(&self, source: &str, stdin: &str, max_output_size: usize) -> String;
}

impl<E: Executor + ?Sized> Executor for std::sync::Arc<E> {
    fn execute(&self, source: &str, stdin: &str, max_output_size: usize) -> String {
        (**self).execute(source, stdin, max_output_size)
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, source: &str, stdin: &str, max_output_size: usize) -> String {
        (**self).execute(source, stdin, max_output_size)
    }
}
