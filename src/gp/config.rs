//! Strategy configuration and specialization.
//!
//! A [`Configuration`] holds, per role, the candidate strategies of a run.
//! [`Configuration::specialize`] pins one strategy per role, drawn uniformly
//! and independently, into a [`Specialization`] that stays fixed until the
//! next draw.
//!
//! The text form lists roles with their codes, for example
//! `score:IC select:PLMD,RSD`. Entries are separated by whitespace or `;`
//! and roles left out keep their default candidates.

use crate::error::{EvoError, Result};
use crate::gp::creation::CreationStrategy;
use crate::gp::crossover::CrossoverStrategy;
use crate::gp::mutation::MutationStrategy;
use crate::gp::registry::{Registry, Role, Strategy};
use crate::gp::reproduction::ReproductionStrategy;
use crate::gp::scoring::ScoringStrategy;
use crate::gp::selection::{Band, DEFAULT_POOL_SIZE, SelectionSize, SelectionStrategy};
use crate::gp::stepping::SteppingStrategy;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candidate strategies for every role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Configuration {
    /// Creation candidates.
    pub create: Vec<CreationStrategy>,
    /// Scoring candidates.
    pub score: Vec<ScoringStrategy>,
    /// Selection candidates.
    pub select: Vec<SelectionStrategy>,
    /// Crossover candidates.
    pub crossover: Vec<CrossoverStrategy>,
    /// Mutation candidates.
    pub mutate: Vec<MutationStrategy>,
    /// Reproduction candidates.
    pub reproduce: Vec<ReproductionStrategy>,
    /// Stepping candidates.
    pub step: Vec<SteppingStrategy>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            create: CreationStrategy::defaults(),
            score: ScoringStrategy::defaults(),
            select: SelectionStrategy::defaults(),
            crossover: CrossoverStrategy::defaults(),
            mutate: MutationStrategy::defaults(),
            reproduce: ReproductionStrategy::defaults(),
            step: SteppingStrategy::defaults(),
        }
    }
}

fn resolve_codes<S: Strategy>(codes: &[&str]) -> Result<Vec<S>> {
    if codes.is_empty() {
        return Err(EvoError::EmptyRole(S::ROLE));
    }
    let registry = Registry::<S>::new();
    codes.iter().map(|code| registry.get(code)).collect()
}

fn pick<S: Strategy, R: Rng + ?Sized>(candidates: &[S], rng: &mut R) -> Result<S> {
    candidates.choose(rng).cloned().ok_or(EvoError::EmptyRole(S::ROLE))
}

fn codes_of<S: Strategy>(strategies: &[S]) -> String {
    strategies.iter().map(Strategy::code).collect::<Vec<_>>().join(",")
}

impl Configuration {
    /// Scoring by plain output comparison, selection of the top 40 percent
    /// of the ranking. Shows how elitism narrows the population.
    #[must_use]
    pub fn showing_elitism() -> Self {
        Self {
            score: vec![ScoringStrategy::IO_COMPARISON],
            select: vec![SelectionStrategy::RankingSlices {
                bands: vec![Band::fixed(0.0, 0.4)],
            }],
            ..Self::default()
        }
    }

    /// Scoring by plain output comparison, pooling selection of 40 percent
    /// of the population ten members per tier.
    #[must_use]
    pub fn best_solution_so_far() -> Self {
        Self {
            score: vec![ScoringStrategy::IO_COMPARISON],
            select: vec![SelectionStrategy::Pooling {
                pool_size: DEFAULT_POOL_SIZE,
                selection_size: SelectionSize::Fraction(0.4),
                unique: false,
            }],
            ..Self::default()
        }
    }

    /// Replace the candidates of `role` by the strategies registered under
    /// `codes`.
    ///
    /// # Errors
    ///
    /// Returns an error if `codes` is empty or holds an unknown code.
    pub fn set_codes(&mut self, role: Role, codes: &[&str]) -> Result<()> {
        match role {
            Role::Create => self.create = resolve_codes(codes)?,
            Role::Score => self.score = resolve_codes(codes)?,
            Role::Select => self.select = resolve_codes(codes)?,
            Role::Crossover => self.crossover = resolve_codes(codes)?,
            Role::Mutate => self.mutate = resolve_codes(codes)?,
            Role::Reproduce => self.reproduce = resolve_codes(codes)?,
            Role::Step => self.step = resolve_codes(codes)?,
        }
        Ok(())
    }

    /// Codes of the candidates of `role`, comma separated.
    #[must_use]
    pub fn codes(&self, role: Role) -> String {
        match role {
            Role::Create => codes_of(&self.create),
            Role::Score => codes_of(&self.score),
            Role::Select => codes_of(&self.select),
            Role::Crossover => codes_of(&self.crossover),
            Role::Mutate => codes_of(&self.mutate),
            Role::Reproduce => codes_of(&self.reproduce),
            Role::Step => codes_of(&self.step),
        }
    }

    /// Draw one strategy per role.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::EmptyRole`] if a role has no candidate.
    pub fn specialize<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Specialization> {
        Ok(Specialization {
            create: pick(&self.create, rng)?,
            score: pick(&self.score, rng)?,
            select: pick(&self.select, rng)?,
            crossover: pick(&self.crossover, rng)?,
            mutate: pick(&self.mutate, rng)?,
            reproduce: pick(&self.reproduce, rng)?,
            step: pick(&self.step, rng)?,
        })
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = Role::ALL
            .iter()
            .map(|&role| format!("{role}:{}", self.codes(role)))
            .collect();
        f.write_str(&entries.join(";"))
    }
}

impl FromStr for Configuration {
    type Err = EvoError;

    fn from_str(s: &str) -> Result<Self> {
        let mut config = Self::default();
        for entry in s.split(|c: char| c == ';' || c.is_whitespace()) {
            if entry.is_empty() {
                continue;
            }
            let (role, codes) = entry
                .split_once(':')
                .ok_or_else(|| EvoError::UnknownRole(entry.to_string()))?;
            let codes: Vec<&str> = codes.split(',').filter(|c| !c.is_empty()).collect();
            config.set_codes(role.parse()?, &codes)?;
        }
        Ok(config)
    }
}

impl TryFrom<String> for Configuration {
    type Error = EvoError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Configuration> for String {
    fn from(config: Configuration) -> Self {
        config.to_string()
    }
}

/// Exactly one strategy per role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    /// Creation strategy.
    pub create: CreationStrategy,
    /// Scoring strategy.
    pub score: ScoringStrategy,
    /// Selection strategy.
    pub select: SelectionStrategy,
    /// Crossover strategy.
    pub crossover: CrossoverStrategy,
    /// Mutation strategy.
    pub mutate: MutationStrategy,
    /// Reproduction strategy.
    pub reproduce: ReproductionStrategy,
    /// Stepping strategy.
    pub step: SteppingStrategy,
}

impl Specialization {
    /// Codes of the pinned strategies, in role order, joined by `/`.
    #[must_use]
    pub fn id(&self) -> String {
        [
            self.create.code(),
            self.score.code(),
            self.select.code(),
            self.crossover.code(),
            self.mutate.code(),
            self.reproduce.code(),
            self.step.code(),
        ]
        .join("/")
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}
