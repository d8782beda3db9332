// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Evotape: evolutionary search for tape-machine programs.
//!
//! This crate evolves short programs in an eight-token tape language until
//! one of them turns a given input into a given output:
//! - strategy-pluggable scoring, selection, crossover, mutation and
//!   reproduction, addressable by short codes
//! - per-run sampling of strategies from a configuration template
//! - parallel scoring on a recycled worker pool
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Run controller / generation step  │
//! ├─────────────────────────────────────┤
//! │   Strategies (gp)                   │
//! ├─────────────────────────────────────┤
//! │   Executor: tape machine (vm)       │
//! └─────────────────────────────────────┘
//! ```

pub mod error;
pub mod gp;
pub mod vm;

pub use error::{EvoError, Result};

// Re-export the types a run needs at crate root for convenience
pub use gp::{Case, Configuration, Genome, Run, RunSettings, Specialization, Token};
pub use vm::{CachedExecutor, Executor, TapeMachine};
