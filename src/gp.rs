//! Evolutionary search over tape-machine programs.
//!
//! Every step of the loop is a role filled by a strategy enum. A
//! [`Configuration`] lists candidate strategies per role, and the run
//! controller pins one per role into a [`Specialization`] every few
//! generations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │   Run controller (specialize, step, resume) │
//! ├─────────────────────────────────────────────┤
//! │  Stepping: score → winners → select → reproduce
//! ├─────────────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation │ Creation │
//! ├─────────────────────────────────────────────┤
//! │   Scoring pool (rayon) → Executor           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use evotape::gp::{Case, Configuration, Run, RunSettings};
//! use evotape::vm::TapeMachine;
//!
//! # fn main() -> evotape::error::Result<()> {
//! let config: Configuration = "score:IC select:PLMD".parse()?;
//! let mut run = Run::new(Case::new("", "hi !"), config, RunSettings::default(), TapeMachine::default())?;
//! run.run(100, |outcome| outcome.generations.iter().any(|g| !g.winners.is_empty()))?;
//! println!("{:?}", run.found_solutions());
//! # Ok(())
//! # }
//! ```

mod case;
mod config;
mod controller;
mod creation;
mod crossover;
mod genome;
mod mutation;
mod pool;
mod registry;
mod reproduction;
mod scoring;
mod selection;
mod stats;
mod stepping;

pub use case::{Case, Expected, Input, InputGenerator, OutputFunction, ResolvedCase, STDIN_PLACEHOLDER};
pub use config::{Configuration, Specialization};
pub use controller::{Continuation, Run, RunSettings, StepOutcome};
pub use creation::{CreationStrategy, ORIENTED_ALPHABET};
pub use crossover::{CrossoverStrategy, token_runs};
pub use genome::{DEFAULT_CHROMOSOME_SIZE, Genome, Token, render, tokenize};
pub use mutation::{MAX_INDEL_SIZE, MutationConfig, MutationStrategy, Mutator};
pub use pool::{PoolConfig, ScoringPool};
pub use registry::{Registry, Role, Strategy, lookup};
pub use reproduction::{Breeding, ReproductionStrategy};
pub use scoring::{
    DEFAULT_MAX_OUTPUT_SIZE, MISSING_BYTE_PENALTY, Scored, ScoredResult, ScoringConfig, ScoringStrategy,
    byte_distance,
};
pub use selection::{
    Band, DEFAULT_POOL_SIZE, DEFAULT_SELECTION_SIZE, MIN_SELECTED, SelectionSize, SelectionStrategy, likelihood,
    pooling, ranking_slices, selection_probability,
};
pub use stats::{GenerationRecord, JsonLinesSink, RecordingSink, StatisticsSink};
pub use stepping::{Generation, StepContext, SteppingStrategy, score_population};
