//! Mutation operators for genetic programming.
//!
//! Mutations introduce random variations in genomes to explore the search
//! space. String-level operators ignore what the tokens mean; structure-aware
//! operators know about loops, input/output and numeric runs. Every operator
//! degrades to a simpler one when the genome is too short for it, and none
//! ever returns an empty token sequence.

use crate::error::{EvoError, Result};
use crate::gp::genome::{Genome, Token};
use crate::gp::registry::{Role, Strategy};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Largest block inserted or deleted by one operator.
pub const MAX_INDEL_SIZE: usize = 10;

/// Configuration for mutation operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability that a mutation call applies one operator.
    pub mutation_rate: f64,
    /// Probability of each further operator application.
    pub additional_mutation_rate: f64,
    /// Runs of `+`/`-` are complemented against this value.
    pub complement_max: usize,
    /// Probability of complementing each numeric run.
    pub complement_probability: f64,
    /// Probability of flipping each run of identical tokens.
    pub group_flip_probability: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            mutation_rate: Genome::MUTATION_RATE,
            additional_mutation_rate: Genome::ADDITIONAL_MUTATION_RATE,
            complement_max: 128,
            complement_probability: 0.5,
            group_flip_probability: 0.01,
        }
    }
}

impl MutationConfig {
    /// Check that every probability lies in [0, 1] and that repeated
    /// mutation terminates.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::InvalidSettings`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let probabilities = [
            ("mutation_rate", self.mutation_rate),
            ("additional_mutation_rate", self.additional_mutation_rate),
            ("complement_probability", self.complement_probability),
            ("group_flip_probability", self.group_flip_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(EvoError::InvalidSettings(format!("{name} = {p} is not a probability")));
            }
        }
        if self.additional_mutation_rate >= 1.0 {
            return Err(EvoError::InvalidSettings(
                "additional_mutation_rate must be below 1".into(),
            ));
        }
        Ok(())
    }
}

/// A single mutation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutator {
    /// Substitute one token.
    Transition,
    /// Substitute 1 to [`MAX_INDEL_SIZE`] tokens.
    MultiTransition,
    /// Insert a run of 1 to [`MAX_INDEL_SIZE`] copies of one token.
    Addition,
    /// Insert one token.
    SingleAddition,
    /// Delete one token.
    SingleDeletion,
    /// Delete a block of 1 to [`MAX_INDEL_SIZE`] tokens.
    Deletion,
    /// Move a block of tokens elsewhere.
    Transposition,
    /// Reverse a block of tokens.
    Reversion,
    /// Move a matched loop with its body elsewhere.
    LoopTransposition,
    /// Turn a read into a write or the reverse.
    IoChange,
    /// Swap a read with a write.
    IoTransposition,
    /// Insert a token between two adjacent writes.
    OutputInterleaving,
    /// Replace runs of N increments by `max - N` decrements and the reverse.
    NumberComplement,
    /// Flip runs of identical tokens to their opposite.
    GroupTransition,
}

impl Mutator {
    /// Operators that ignore token semantics.
    pub const STRING_LEVEL: [Mutator; 8] = [
        Mutator::Transition,
        Mutator::MultiTransition,
        Mutator::Addition,
        Mutator::SingleAddition,
        Mutator::SingleDeletion,
        Mutator::Deletion,
        Mutator::Transposition,
        Mutator::Reversion,
    ];

    /// Operators aware of loops, input/output and numeric runs.
    pub const STRUCTURAL: [Mutator; 6] = [
        Mutator::LoopTransposition,
        Mutator::IoChange,
        Mutator::IoTransposition,
        Mutator::OutputInterleaving,
        Mutator::NumberComplement,
        Mutator::GroupTransition,
    ];

    /// Every operator.
    pub const ALL: [Mutator; 14] = [
        Mutator::Transition,
        Mutator::MultiTransition,
        Mutator::Addition,
        Mutator::SingleAddition,
        Mutator::SingleDeletion,
        Mutator::Deletion,
        Mutator::Transposition,
        Mutator::Reversion,
        Mutator::LoopTransposition,
        Mutator::IoChange,
        Mutator::IoTransposition,
        Mutator::OutputInterleaving,
        Mutator::NumberComplement,
        Mutator::GroupTransition,
    ];

    /// Apply the operator to `tokens`.
    ///
    /// Never returns an empty sequence; an empty input gets one random
    /// token.
    #[must_use]
    pub fn apply<R: Rng + ?Sized>(self, tokens: &[Token], config: &MutationConfig, rng: &mut R) -> Vec<Token> {
        if tokens.is_empty() {
            return vec![Token::random(rng)];
        }
        if Mutator::STRING_LEVEL.contains(&self) {
            self.apply_string_level(tokens.to_vec(), config, rng)
        } else {
            self.apply_structural(tokens.to_vec(), config, rng)
        }
    }

    fn apply_string_level<R: Rng + ?Sized>(
        self,
        mut tokens: Vec<Token>,
        config: &MutationConfig,
        rng: &mut R,
    ) -> Vec<Token> {
        let len = tokens.len();
        match self {
            Mutator::Transition => {
                let idx = rng.gen_range(0..len);
                tokens[idx] = Token::random(rng);
            }
            Mutator::MultiTransition => {
                for _ in 0..rng.gen_range(1..=MAX_INDEL_SIZE) {
                    let idx = rng.gen_range(0..len);
                    tokens[idx] = Token::random(rng);
                }
            }
            Mutator::Addition => {
                let token = Token::random(rng);
                let count = rng.gen_range(1..=MAX_INDEL_SIZE);
                let at = rng.gen_range(0..=len);
                tokens.splice(at..at, std::iter::repeat_n(token, count));
            }
            Mutator::SingleAddition => {
                let at = rng.gen_range(0..=len);
                tokens.insert(at, Token::random(rng));
            }
            Mutator::SingleDeletion => {
                if len <= 1 {
                    return Mutator::SingleAddition.apply(&tokens, config, rng);
                }
                tokens.remove(rng.gen_range(0..len));
            }
            Mutator::Deletion => {
                let size = rng.gen_range(1..=MAX_INDEL_SIZE);
                if size >= len {
                    return Mutator::SingleDeletion.apply(&tokens, config, rng);
                }
                let start = rng.gen_range(0..=len - size);
                tokens.drain(start..start + size);
            }
            Mutator::Transposition => {
                let size = rng.gen_range(2..=MAX_INDEL_SIZE + 1);
                if size >= len {
                    return Mutator::SingleDeletion.apply(&tokens, config, rng);
                }
                let start = rng.gen_range(0..=len - size);
                let block: Vec<Token> = tokens.drain(start..start + size).collect();
                let at = rng.gen_range(0..=tokens.len());
                tokens.splice(at..at, block);
            }
            Mutator::Reversion => {
                let size = rng.gen_range(2..=MAX_INDEL_SIZE);
                if size > len {
                    return Mutator::SingleDeletion.apply(&tokens, config, rng);
                }
                let start = rng.gen_range(0..=len - size);
                tokens[start..start + size].reverse();
            }
            _ => return self.apply_structural(tokens, config, rng),
        }
        tokens
    }

    fn apply_structural<R: Rng + ?Sized>(
        self,
        mut tokens: Vec<Token>,
        config: &MutationConfig,
        rng: &mut R,
    ) -> Vec<Token> {
        match self {
            Mutator::LoopTransposition => {
                let Some(&(open, close)) = matched_loops(&tokens).choose(rng) else {
                    return Mutator::Transition.apply(&tokens, config, rng);
                };
                let block: Vec<Token> = tokens.drain(open..=close).collect();
                let at = rng.gen_range(0..=tokens.len());
                tokens.splice(at..at, block);
            }
            Mutator::IoChange => {
                let Some(&idx) = positions(&tokens, |t| matches!(t, Token::Read | Token::Write)).choose(rng)
                else {
                    return Mutator::Transposition.apply(&tokens, config, rng);
                };
                tokens[idx] = tokens[idx].opposite();
            }
            Mutator::IoTransposition => {
                let reads = positions(&tokens, |t| t == Token::Read);
                let writes = positions(&tokens, |t| t == Token::Write);
                match (reads.choose(rng), writes.choose(rng)) {
                    (Some(&read), Some(&write)) => tokens.swap(read, write),
                    _ => return Mutator::Transposition.apply(&tokens, config, rng),
                }
            }
            Mutator::OutputInterleaving => {
                let pairs: Vec<usize> = tokens
                    .windows(2)
                    .enumerate()
                    .filter(|(_, w)| w[0] == Token::Write && w[1] == Token::Write)
                    .map(|(idx, _)| idx + 1)
                    .collect();
                let Some(&at) = pairs.choose(rng) else {
                    return Mutator::IoTransposition.apply(&tokens, config, rng);
                };
                tokens.insert(at, Token::random(rng));
            }
            Mutator::NumberComplement => {
                return complement_runs(&tokens, config, rng);
            }
            Mutator::GroupTransition => {
                let p = config.group_flip_probability.clamp(0.0, 1.0);
                for run in tokens.chunk_by_mut(|a, b| a == b) {
                    if rng.gen_bool(p) {
                        for token in run {
                            *token = token.opposite();
                        }
                    }
                }
            }
            _ => return self.apply_string_level(tokens, config, rng),
        }
        tokens
    }
}

fn positions(tokens: &[Token], keep: impl Fn(Token) -> bool) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|&(_, &t)| keep(t))
        .map(|(idx, _)| idx)
        .collect()
}

/// `(open, close)` positions of every matched loop.
fn matched_loops(tokens: &[Token]) -> Vec<(usize, usize)> {
    let mut stack = Vec::new();
    let mut loops = Vec::new();
    for (idx, &token) in tokens.iter().enumerate() {
        match token {
            Token::LoopOpen => stack.push(idx),
            Token::LoopClose => {
                if let Some(open) = stack.pop() {
                    loops.push((open, idx));
                }
            }
            _ => {}
        }
    }
    loops
}

fn complement_runs<R: Rng + ?Sized>(tokens: &[Token], config: &MutationConfig, rng: &mut R) -> Vec<Token> {
    let p = config.complement_probability.clamp(0.0, 1.0);
    let mut out = Vec::with_capacity(tokens.len());
    for run in tokens.chunk_by(|a, b| a == b) {
        let numeric = matches!(run[0], Token::Increment | Token::Decrement);
        if numeric && run.len() < config.complement_max && rng.gen_bool(p) {
            out.extend(std::iter::repeat_n(run[0].opposite(), config.complement_max - run.len()));
        } else {
            out.extend_from_slice(run);
        }
    }
    out
}

/// Mutation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationStrategy {
    /// String-level operators.
    StringLevel,
    /// Structure-aware operators.
    Structural,
    /// Every operator.
    All,
    /// Leave genomes unchanged.
    NoMutation,
}

impl MutationStrategy {
    /// Operators drawn from by this strategy.
    #[must_use]
    pub fn operators(self) -> &'static [Mutator] {
        match self {
            Self::StringLevel => &Mutator::STRING_LEVEL,
            Self::Structural => &Mutator::STRUCTURAL,
            Self::All => &Mutator::ALL,
            Self::NoMutation => &[],
        }
    }

    /// Mutate a copy of `genome`.
    ///
    /// One operator is applied if a roll at `mutation_rate` succeeds, then
    /// one more for every consecutive success at `additional_mutation_rate`.
    #[must_use]
    pub fn mutate<R: Rng + ?Sized>(self, genome: &Genome, config: &MutationConfig, rng: &mut R) -> Genome {
        let operators = self.operators();
        if operators.is_empty() || !rng.gen_bool(config.mutation_rate.clamp(0.0, 1.0)) {
            return genome.clone();
        }
        let additional = config.additional_mutation_rate.clamp(0.0, 1.0);
        let mut tokens = genome.tokens().to_vec();
        loop {
            if let Some(op) = operators.choose(rng) {
                tokens = op.apply(&tokens, config, rng);
            }
            if !rng.gen_bool(additional) {
                break;
            }
        }
        genome.with_tokens(tokens)
    }
}

impl Strategy for MutationStrategy {
    const ROLE: Role = Role::Mutate;

    fn named() -> Vec<(String, Self)> {
        [Self::StringLevel, Self::Structural, Self::All, Self::NoMutation]
            .into_iter()
            .map(|s| (s.code(), s))
            .collect()
    }

    fn defaults() -> Vec<Self> {
        vec![Self::StringLevel, Self::Structural, Self::All]
    }

    fn code(&self) -> String {
        match self {
            Self::StringLevel => "MS",
            Self::Structural => "MF",
            Self::All => "MA",
            Self::NoMutation => "MN",
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::genome::{render, tokenize};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn apply(op: Mutator, source: &str, rng: &mut SmallRng) -> String {
        render(&op.apply(&tokenize(source), &MutationConfig::default(), rng))
    }

    #[test]
    fn test_operators_never_empty() {
        let mut rng = SmallRng::seed_from_u64(42);
        for op in Mutator::ALL {
            for source in ["", "+", ".", "[", "+-", "..", ",.", "[+]", "++++++++++++"] {
                for _ in 0..20 {
                    assert!(!apply(op, source, &mut rng).is_empty(), "{op:?} on {source:?}");
                }
            }
        }
    }

    #[test]
    fn test_families_partition_all_operators() {
        for op in Mutator::ALL {
            let string_level = Mutator::STRING_LEVEL.contains(&op);
            let structural = Mutator::STRUCTURAL.contains(&op);
            assert!(string_level != structural, "{op:?}");
        }
        assert_eq!(Mutator::STRING_LEVEL.len() + Mutator::STRUCTURAL.len(), Mutator::ALL.len());
    }

    #[test]
    fn test_single_indels() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(apply(Mutator::SingleAddition, "++", &mut rng).len(), 3);
        assert_eq!(apply(Mutator::SingleDeletion, "++", &mut rng).len(), 1);
        // Too short to delete
        assert_eq!(apply(Mutator::SingleDeletion, "+", &mut rng).len(), 2);
    }

    #[test]
    fn test_addition_inserts_a_run() {
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..20 {
            let out = apply(Mutator::Addition, ".", &mut rng);
            assert!((2..=MAX_INDEL_SIZE + 1).contains(&out.len()));
        }
    }

    #[test]
    fn test_block_operators_keep_multiset() {
        let mut rng = SmallRng::seed_from_u64(3);
        let source = "+++---<<<>>>[].,";
        let mut sorted_source: Vec<char> = source.chars().collect();
        sorted_source.sort_unstable();
        for op in [Mutator::Transposition, Mutator::Reversion, Mutator::LoopTransposition] {
            for _ in 0..20 {
                let mut out: Vec<char> = apply(op, source, &mut rng).chars().collect();
                out.sort_unstable();
                assert_eq!(out, sorted_source, "{op:?}");
            }
        }
    }

    #[test]
    fn test_loop_transposition_moves_whole_loop() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..20 {
            let out = apply(Mutator::LoopTransposition, "..[+-]..", &mut rng);
            assert!(out.contains("[+-]"), "{out}");
        }
    }

    #[test]
    fn test_io_operators() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert_eq!(apply(Mutator::IoChange, "+.+", &mut rng), "+,+");
        assert_eq!(apply(Mutator::IoTransposition, ",+.", &mut rng), ".+,");

        let out = apply(Mutator::OutputInterleaving, "+..", &mut rng);
        assert_eq!(out.len(), 4);
        assert!(out.starts_with("+."));
        assert!(out.ends_with('.'));
    }

    #[test]
    fn test_number_complement() {
        let mut rng = SmallRng::seed_from_u64(6);
        let config = MutationConfig {
            complement_probability: 1.0,
            ..MutationConfig::default()
        };
        let out = render(&Mutator::NumberComplement.apply(&tokenize("+++.--"), &config, &mut rng));
        assert_eq!(out, format!("{}.{}", "-".repeat(125), "+".repeat(126)));
    }

    #[test]
    fn test_group_transition() {
        let mut rng = SmallRng::seed_from_u64(7);
        let config = MutationConfig {
            group_flip_probability: 1.0,
            ..MutationConfig::default()
        };
        let out = render(&Mutator::GroupTransition.apply(&tokenize("++<[."), &config, &mut rng));
        assert_eq!(out, "-->],");
    }

    #[test]
    fn test_no_mutation_strategy() {
        let mut rng = SmallRng::seed_from_u64(8);
        let config = MutationConfig {
            mutation_rate: 1.0,
            ..MutationConfig::default()
        };
        let genome = Genome::parse("+.").unwrap();
        assert_eq!(MutationStrategy::NoMutation.mutate(&genome, &config, &mut rng), genome);
    }

    #[test]
    fn test_mutation_intensity() {
        let mut rng = SmallRng::seed_from_u64(9);
        let genome = Genome::parse(&"+-<>.,".repeat(5)).unwrap();

        let never = MutationConfig {
            mutation_rate: 0.0,
            ..MutationConfig::default()
        };
        assert_eq!(MutationStrategy::All.mutate(&genome, &never, &mut rng), genome);

        let always = MutationConfig {
            mutation_rate: 1.0,
            ..MutationConfig::default()
        };
        let changed = (0..50)
            .filter(|_| MutationStrategy::StringLevel.mutate(&genome, &always, &mut rng) != genome)
            .count();
        assert!(changed > 25);
    }

    #[test]
    fn test_config_validation() {
        assert!(MutationConfig::default().validate().is_ok());
        let bad = MutationConfig {
            additional_mutation_rate: 1.0,
            ..MutationConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = MutationConfig {
            mutation_rate: -0.1,
            ..MutationConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
