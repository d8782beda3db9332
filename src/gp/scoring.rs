//! Fitness scoring.
//!
//! A genome is run on the resolved case and scored by how far its output is
//! from the expected one: `base - distance(expected, found)`. Strategies may
//! add a bonus for exact solutions and a malus proportional to the genome
//! length.

// Scores are real numbers built from byte counts
#![allow(clippy::cast_precision_loss)]

use crate::error::{EvoError, Result};
use crate::gp::case::ResolvedCase;
use crate::gp::genome::Genome;
use crate::gp::registry::{Role, Strategy};
use crate::vm::Executor;
use serde::{Deserialize, Serialize};

/// Penalty charged for each position present in only one string.
pub const MISSING_BYTE_PENALTY: u64 = u8::MAX as u64;

/// Default output buffer handed to the executor.
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 32;

/// Byte-wise distance between two strings.
///
/// Sums the absolute difference of bytes at common positions and charges
/// [`MISSING_BYTE_PENALTY`] for every byte of the longer string past the end
/// of the shorter one.
#[must_use]
pub fn byte_distance(a: &[u8], b: &[u8]) -> u64 {
    let common: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    let missing = a.len().abs_diff(b.len()) as u64;
    common + missing * MISSING_BYTE_PENALTY
}

/// Parameters shared by every scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score of an exact match before bonus and malus.
    pub base: f64,
    /// Added when the output equals the expected output.
    pub exact_bonus: f64,
    /// Subtracted per genome token.
    pub length_malus: f64,
    /// Lowest possible final score, applied after bonus and malus.
    pub floor: Option<f64>,
    /// Output buffer size given to the executor.
    pub max_output_size: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: 10_000.0,
            exact_bonus: 1_000.0,
            length_malus: 1.0,
            floor: None,
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
        }
    }
}

/// Outcome of scoring one genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// Fitness; higher is better.
    pub score: f64,
    /// Output the genome should have produced.
    pub expected: String,
    /// Output the genome produced.
    pub found: String,
}

impl ScoredResult {
    /// Placeholder for genomes that have not been run yet.
    #[must_use]
    pub fn unscored() -> Self {
        Self {
            score: 0.0,
            expected: String::new(),
            found: String::new(),
        }
    }

    /// True if the genome produced exactly the expected output.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.found == self.expected
    }
}

/// A genome with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    /// The scored genome.
    pub genome: Genome,
    /// Its result.
    pub result: ScoredResult,
}

impl Scored {
    /// Shorthand for `self.result.score`.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.result.score
    }
}

/// Scoring strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringStrategy {
    /// Compare output with the expected output.
    IoComparison {
        /// Add the exact-match bonus.
        exact_bonus: bool,
        /// Subtract the length malus.
        length_malus: bool,
    },
}

impl ScoringStrategy {
    /// Plain output comparison.
    pub const IO_COMPARISON: Self = Self::IoComparison {
        exact_bonus: false,
        length_malus: false,
    };

    /// Score `genome` on `case`.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::ExpectedTooLong`] if the expected output does not
    /// fit in `config.max_output_size`.
    pub fn score<E: Executor + ?Sized>(
        &self,
        genome: &Genome,
        case: &ResolvedCase,
        executor: &E,
        config: &ScoringConfig,
    ) -> Result<ScoredResult> {
        if case.expected.len() >= config.max_output_size {
            return Err(EvoError::ExpectedTooLong {
                expected_len: case.expected.len(),
                max_output_size: config.max_output_size,
            });
        }

        let found = executor.execute(&genome.source(), &case.stdin, config.max_output_size);
        let distance = byte_distance(case.expected.as_bytes(), found.as_bytes());
        let mut score = config.base - distance as f64;

        let Self::IoComparison {
            exact_bonus,
            length_malus,
        } = *self;
        if exact_bonus && found == case.expected {
            score += config.exact_bonus;
        }
        if length_malus {
            score -= config.length_malus * genome.len() as f64;
        }
        if let Some(floor) = config.floor {
            score = score.max(floor);
        }

        Ok(ScoredResult {
            score,
            expected: case.expected.clone(),
            found,
        })
    }
}

impl Strategy for ScoringStrategy {
    const ROLE: Role = Role::Score;

    fn named() -> Vec<(String, Self)> {
        let mut named = Vec::new();
        for exact_bonus in [false, true] {
            for length_malus in [false, true] {
                let strategy = Self::IoComparison {
                    exact_bonus,
                    length_malus,
                };
                named.push((strategy.code(), strategy));
            }
        }
        named
    }

    fn defaults() -> Vec<Self> {
        vec![Self::IO_COMPARISON]
    }

    fn code(&self) -> String {
        let Self::IoComparison {
            exact_bonus,
            length_malus,
        } = *self;
        let mut code = String::from("IC");
        if exact_bonus {
            code.push('B');
        }
        if length_malus {
            code.push('M');
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::genome::tokenize;
    use crate::vm::TapeMachine;

    fn hello() -> Genome {
        Genome::parse(&format!("{}.+.>{}.+.", "+".repeat(104), "+".repeat(32))).unwrap()
    }

    fn case(expected: &str) -> ResolvedCase {
        ResolvedCase {
            stdin: String::new(),
            expected: expected.to_string(),
        }
    }

    #[test]
    fn test_byte_distance() {
        assert_eq!(byte_distance(b"a", b"b"), 1);
        assert_eq!(byte_distance(b"a", b"bc"), 1 + 255);
        assert_eq!(byte_distance(b"", b"abc"), 3 * 255);
        assert_eq!(byte_distance(b"hi !", b"hi !"), 0);
    }

    #[test]
    fn test_exact_match_reaches_base() {
        let config = ScoringConfig::default();
        let result = ScoringStrategy::IO_COMPARISON
            .score(&hello(), &case("hi !"), &TapeMachine::default(), &config)
            .unwrap();

        assert!(result.is_exact());
        assert!((result.score - config.base).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_match_beats_near_miss() {
        let config = ScoringConfig::default();
        let machine = TapeMachine::default();
        let exact = ScoringStrategy::IO_COMPARISON
            .score(&hello(), &case("hi !"), &machine, &config)
            .unwrap();
        let near = ScoringStrategy::IO_COMPARISON
            .score(&hello(), &case("hi \""), &machine, &config)
            .unwrap();
        assert!(exact.score > near.score);
    }

    #[test]
    fn test_bonus_and_malus() {
        let config = ScoringConfig::default();
        let machine = TapeMachine::default();
        let genome = hello();
        let both = ScoringStrategy::IoComparison {
            exact_bonus: true,
            length_malus: true,
        }
        .score(&genome, &case("hi !"), &machine, &config)
        .unwrap();

        let expected = config.base + config.exact_bonus - genome.len() as f64;
        assert!((both.score - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_floor_applied_last() {
        let config = ScoringConfig {
            floor: Some(0.0),
            length_malus: 1_000.0,
            ..ScoringConfig::default()
        };
        let genome = Genome::new(tokenize("+++++++++++++"), 8).unwrap();
        let result = ScoringStrategy::IoComparison {
            exact_bonus: false,
            length_malus: true,
        }
        .score(&genome, &case("a"), &TapeMachine::default(), &config)
        .unwrap();
        assert!(result.score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_expected_too_long() {
        let config = ScoringConfig {
            max_output_size: 4,
            ..ScoringConfig::default()
        };
        let err = ScoringStrategy::IO_COMPARISON
            .score(&hello(), &case("hi !"), &TapeMachine::default(), &config)
            .unwrap_err();
        assert!(matches!(err, EvoError::ExpectedTooLong { .. }));
    }

    #[test]
    fn test_codes() {
        let codes: Vec<String> = ScoringStrategy::named().into_iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec!["IC", "ICM", "ICB", "ICBM"]);
    }
}
