//! Error types for the evolutionary search.

use crate::gp::Role;

/// Errors raised by the search engine.
///
/// Every variant except the wrapped I/O, JSON and thread-pool errors is a
/// usage error: invalid arguments that must fail loudly instead of degrading.
#[derive(Debug, thiserror::Error)]
pub enum EvoError {
    /// A strategy code has no entry in its role's lookup table.
    #[error("unknown {role} strategy code: {code:?}")]
    UnknownStrategy {
        /// Role whose table was searched.
        role: Role,
        /// The code that was not found.
        code: String,
    },

    /// A role name in a configuration string is not recognised.
    #[error("unknown strategy role: {0:?}")]
    UnknownRole(String),

    /// A configuration gives a role an empty strategy set.
    #[error("no strategy given for role {0}")]
    EmptyRole(Role),

    /// A selection size is zero, negative, or a fraction outside [0, 1].
    #[error("invalid selection size: {0}")]
    InvalidSelectionSize(String),

    /// More members were requested than the population holds.
    #[error("cannot select {requested} of {available} scored genomes")]
    SelectionTooLarge {
        /// Number of members requested.
        requested: usize,
        /// Size of the scored population.
        available: usize,
    },

    /// A ranking band is negative, non-finite, or inverted.
    #[error("invalid ranking band ({start}, {stop})")]
    InvalidBand {
        /// Lower bound as given.
        start: f64,
        /// Upper bound as given.
        stop: f64,
    },

    /// Selection returned fewer than two parents.
    #[error("selection returned {0} genomes, at least 2 are required")]
    SelectionUnderflow(usize),

    /// A population too small for the requested operation.
    #[error("population of {0} genomes is too small, at least 2 are required")]
    PopulationTooSmall(usize),

    /// Reproduction or crossover was given no parents.
    #[error("parent set is empty")]
    EmptyParents,

    /// The kept parents alone exceed the requested generation size.
    #[error("target size {target} is smaller than the {kept} kept parents")]
    TargetTooSmall {
        /// Requested size of the next generation.
        target: usize,
        /// Number of parents kept verbatim.
        kept: usize,
    },

    /// A crossover strategy produced no tokens.
    #[error("crossover {0} produced an empty genome")]
    EmptyOffspring(String),

    /// A genome was built without any token.
    #[error("genome must contain at least one token")]
    EmptyGenome,

    /// A genome was built with a chromosome size of zero.
    #[error("chromosome size must be positive")]
    InvalidChromosomeSize,

    /// The expected output cannot fit in the executor's output buffer.
    #[error("expected output of {expected_len} bytes does not fit an output of {max_output_size}")]
    ExpectedTooLong {
        /// Length of the expected output in bytes.
        expected_len: usize,
        /// Maximum output size given to the executor.
        max_output_size: usize,
    },

    /// A continuation token from an earlier step was reused.
    #[error("stale continuation for step {found}, the run is at step {expected}")]
    StaleContinuation {
        /// Step the run is waiting for.
        expected: usize,
        /// Step carried by the token.
        found: usize,
    },

    /// Run settings that cannot be honoured.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Building the scoring thread pool failed.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, EvoError>;
