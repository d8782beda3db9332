//! Crossover operators for genetic programming.
//!
//! Crossover combines two or more parents into the tokens of one child.
//! Block-structured strategies walk a shared index across the parents;
//! positional strategies vote or draw per position.

use crate::error::{EvoError, Result};
use crate::gp::genome::{Genome, Token};
use crate::gp::registry::{Role, Strategy};
use rand::Rng;
use rand::seq::{IteratorRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Crossover strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossoverStrategy {
    /// Interleave chromosomes: block `i` comes from parent `i mod k`.
    Chromosomes,
    /// Cut at random pivots and take one slice per parent.
    Pivots,
    /// Interleave runs of identical tokens like chromosomes.
    TokenRuns,
    /// Majority vote per position.
    Consensus,
    /// Uniform draw among the tokens present at each position.
    RandomDraw,
    /// Keep common tokens, resolve differences at random.
    Difference,
}

impl CrossoverStrategy {
    /// Every crossover strategy.
    pub const ALL: [CrossoverStrategy; 6] = [
        CrossoverStrategy::Chromosomes,
        CrossoverStrategy::Pivots,
        CrossoverStrategy::TokenRuns,
        CrossoverStrategy::Consensus,
        CrossoverStrategy::RandomDraw,
        CrossoverStrategy::Difference,
    ];

    /// Cross `parents` into the tokens of a child.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::EmptyParents`] without parents and
    /// [`EvoError::EmptyOffspring`] if the strategy produced no token.
    pub fn cross<R: Rng + ?Sized>(&self, parents: &[&Genome], rng: &mut R) -> Result<Vec<Token>> {
        if parents.is_empty() {
            return Err(EvoError::EmptyParents);
        }
        let tokens = match self {
            Self::Chromosomes => interleave(parents, |g| g.chromosomes().map(<[Token]>::to_vec).collect()),
            Self::Pivots => by_pivots(parents, rng),
            Self::TokenRuns => interleave(parents, |g| token_runs(g.tokens())),
            Self::Consensus => by_consensus(parents, rng),
            Self::RandomDraw | Self::Difference => by_random_draw(parents, rng),
        };
        if tokens.is_empty() {
            return Err(EvoError::EmptyOffspring(self.code()));
        }
        Ok(tokens)
    }
}

impl Genome {
    /// Cross `parents` into a new genome.
    ///
    /// The child takes the chromosome size of a randomly chosen parent.
    ///
    /// # Errors
    ///
    /// Propagates [`CrossoverStrategy::cross`] errors.
    pub fn crossed<R: Rng + ?Sized>(
        parents: &[&Genome],
        strategy: CrossoverStrategy,
        rng: &mut R,
    ) -> Result<Genome> {
        let tokens = strategy.cross(parents, rng)?;
        let chromosome_size = parents
            .choose(rng)
            .map_or(crate::gp::genome::DEFAULT_CHROMOSOME_SIZE, |g| g.chromosome_size());
        Genome::new(tokens, chromosome_size)
    }
}

/// Split tokens into runs of identical tokens.
#[must_use]
pub fn token_runs(tokens: &[Token]) -> Vec<Vec<Token>> {
    tokens.chunk_by(|a, b| a == b).map(<[Token]>::to_vec).collect()
}

/// Take group `i` from parent `i mod k` until that parent has no group `i`.
fn interleave(parents: &[&Genome], groups: impl Fn(&Genome) -> Vec<Vec<Token>>) -> Vec<Token> {
    let grouped: Vec<Vec<Vec<Token>>> = parents.iter().map(|&g| groups(g)).collect();
    let mut tokens = Vec::new();
    for i in 0.. {
        match grouped[i % grouped.len()].get(i) {
            Some(group) => tokens.extend_from_slice(group),
            None => break,
        }
    }
    tokens
}

fn by_pivots<R: Rng + ?Sized>(parents: &[&Genome], rng: &mut R) -> Vec<Token> {
    let k = parents.len();
    let shortest = parents.iter().map(|g| g.len()).min().unwrap_or(0);

    // k - 1 distinct cut points in 1..shortest
    if shortest < k {
        let long_enough: Vec<&Genome> = parents.iter().copied().filter(|g| g.len() >= k).collect();
        if long_enough.len() >= 2 {
            return by_pivots(&long_enough, rng);
        }
        return parents.iter().flat_map(|g| g.tokens().iter().copied()).collect();
    }

    let mut pivots: Vec<usize> = rand::seq::index::sample(rng, shortest - 1, k - 1)
        .into_iter()
        .map(|p| p + 1)
        .collect();
    pivots.sort_unstable();
    pivots.insert(0, 0);

    let mut tokens = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        let start = pivots[i];
        let stop = pivots.get(i + 1).copied().unwrap_or(parent.len());
        tokens.extend_from_slice(&parent.tokens()[start..stop]);
    }
    tokens
}

/// Tokens at `position` in each parent, `None` past a parent's end.
fn column<'a>(parents: &'a [&Genome], position: usize) -> impl Iterator<Item = Option<Token>> + 'a {
    parents.iter().map(move |g| g.tokens().get(position).copied())
}

fn longest(parents: &[&Genome]) -> usize {
    parents.iter().map(|g| g.len()).max().unwrap_or(0)
}

fn by_consensus<R: Rng + ?Sized>(parents: &[&Genome], rng: &mut R) -> Vec<Token> {
    let mut tokens = Vec::new();
    for position in 0..longest(parents) {
        let mut counts: BTreeMap<Option<Token>, usize> = BTreeMap::new();
        for value in column(parents, position) {
            *counts.entry(value).or_default() += 1;
        }
        let top = counts.values().copied().max().unwrap_or(0);
        // Padding takes part in the vote and emits nothing when it wins
        let winner = counts
            .into_iter()
            .filter(|&(_, count)| count == top)
            .map(|(value, _)| value)
            .choose(rng)
            .flatten();
        tokens.extend(winner);
    }
    tokens
}

fn by_random_draw<R: Rng + ?Sized>(parents: &[&Genome], rng: &mut R) -> Vec<Token> {
    let mut tokens = Vec::new();
    for position in 0..longest(parents) {
        let present: BTreeSet<Token> = column(parents, position).flatten().collect();
        tokens.extend(present.into_iter().choose(rng));
    }
    tokens
}

impl Strategy for CrossoverStrategy {
    const ROLE: Role = Role::Crossover;

    fn named() -> Vec<(String, Self)> {
        Self::ALL.iter().map(|s| (s.code(), *s)).collect()
    }

    fn defaults() -> Vec<Self> {
        Self::ALL.to_vec()
    }

    fn code(&self) -> String {
        match self {
            Self::Chromosomes => "CC",
            Self::Pivots => "CP",
            Self::TokenRuns => "CT",
            Self::Consensus => "CN",
            Self::RandomDraw => "CR",
            Self::Difference => "CD",
        }
        .to_string()
    }
}
