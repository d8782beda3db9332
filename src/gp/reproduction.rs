//! Next-generation assembly.
//!
//! Reproduction fills a generation of exactly `target_size` genomes from the
//! selected parents: optionally the parents themselves, then mutated
//! offspring of parent pairs.

use crate::error::{EvoError, Result};
use crate::gp::crossover::CrossoverStrategy;
use crate::gp::genome::Genome;
use crate::gp::mutation::{MutationConfig, MutationStrategy};
use crate::gp::registry::{Role, Strategy};
use crate::gp::scoring::Scored;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// The crossover and mutation applied to each pair of parents.
#[derive(Debug, Clone, Copy)]
pub struct Breeding<'a> {
    /// Crossover strategy.
    pub crossover: CrossoverStrategy,
    /// Mutation strategy.
    pub mutation: MutationStrategy,
    /// Mutation parameters.
    pub config: &'a MutationConfig,
}

impl Breeding<'_> {
    fn child<R: Rng + ?Sized>(&self, a: &Genome, b: &Genome, rng: &mut R) -> Result<Genome> {
        let child = Genome::crossed(&[a, b], self.crossover, rng)?;
        Ok(self.mutation.mutate(&child, self.config, rng))
    }
}

/// Reproduction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReproductionStrategy {
    /// Draw two distinct parents for every child.
    WithReplacement {
        /// Copy the parents into the next generation.
        keep_parents: bool,
        /// Draw parents proportionally to their positive score.
        weighted: bool,
    },
    /// Shuffle the parents and pair them up, until the generation is full.
    PairAll {
        /// Copy the parents into the next generation.
        keep_parents: bool,
    },
}

impl ReproductionStrategy {
    /// Whether selected parents survive into the next generation.
    #[must_use]
    pub fn keeps_parents(self) -> bool {
        match self {
            Self::WithReplacement { keep_parents, .. } | Self::PairAll { keep_parents } => keep_parents,
        }
    }

    /// The same strategy, keeping parents.
    #[must_use]
    pub fn keeping_parents(self) -> Self {
        match self {
            Self::WithReplacement { weighted, .. } => Self::WithReplacement {
                keep_parents: true,
                weighted,
            },
            Self::PairAll { .. } => Self::PairAll { keep_parents: true },
        }
    }

    /// Build exactly `target_size` genomes from `selected`.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::EmptyParents`] if `selected` is empty and
    /// [`EvoError::TargetTooSmall`] if the kept parents do not fit in
    /// `target_size`. Crossover errors are propagated.
    pub fn reproduce<R: Rng + ?Sized>(
        &self,
        selected: &[Scored],
        target_size: usize,
        breeding: &Breeding<'_>,
        rng: &mut R,
    ) -> Result<Vec<Genome>> {
        if selected.is_empty() {
            return Err(EvoError::EmptyParents);
        }
        let mut next = Vec::with_capacity(target_size);
        if self.keeps_parents() {
            if selected.len() > target_size {
                return Err(EvoError::TargetTooSmall {
                    target: target_size,
                    kept: selected.len(),
                });
            }
            next.extend(selected.iter().map(|s| s.genome.clone()));
        }

        match *self {
            Self::WithReplacement { weighted, .. } => {
                let weights: Vec<f64> = selected
                    .iter()
                    .map(|s| {
                        let score = s.score();
                        if weighted && score.is_finite() && score > 0.0 { score } else { 1.0 }
                    })
                    .collect();
                while next.len() < target_size {
                    let (a, b) = draw_pair(&weights, rng);
                    next.push(breeding.child(&selected[a].genome, &selected[b].genome, rng)?);
                }
            }
            Self::PairAll { .. } => {
                let filler = rng.gen_range(0..selected.len());
                let mut order: Vec<usize> = (0..selected.len()).collect();
                while next.len() < target_size {
                    order.shuffle(rng);
                    for pair in order.chunks(2) {
                        if next.len() >= target_size {
                            break;
                        }
                        let (a, b) = match *pair {
                            [a, b] => (a, b),
                            [a] => (a, filler),
                            _ => continue,
                        };
                        next.push(breeding.child(&selected[a].genome, &selected[b].genome, rng)?);
                    }
                }
            }
        }
        Ok(next)
    }
}

/// Two distinct indices drawn by weight; a lone parent pairs with itself.
fn draw_pair<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> (usize, usize) {
    if weights.len() < 2 {
        return (0, 0);
    }
    let indices: Vec<usize> = (0..weights.len()).collect();
    let drawn: Vec<usize> = indices
        .choose_multiple_weighted(rng, 2, |&i| weights[i])
        .map(|it| it.copied().collect())
        .unwrap_or_default();
    if let [a, b] = drawn[..] {
        return (a, b);
    }
    let pair = rand::seq::index::sample(rng, weights.len(), 2);
    (pair.index(0), pair.index(1))
}

impl Strategy for ReproductionStrategy {
    const ROLE: Role = Role::Reproduce;

    fn named() -> Vec<(String, Self)> {
        let mut named = Vec::new();
        for keep_parents in [false, true] {
            for weighted in [false, true] {
                let strategy = Self::WithReplacement {
                    keep_parents,
                    weighted,
                };
                named.push((strategy.code(), strategy));
            }
        }
        for keep_parents in [false, true] {
            let strategy = Self::PairAll { keep_parents };
            named.push((strategy.code(), strategy));
        }
        named
    }

    fn defaults() -> Vec<Self> {
        Self::named().into_iter().map(|(_, s)| s).collect()
    }

    fn code(&self) -> String {
        let keep = if self.keeps_parents() { "P" } else { "" };
        match self {
            Self::WithReplacement { weighted, .. } => {
                format!("PR{keep}{}", if *weighted { "W" } else { "" })
            }
            Self::PairAll { .. } => format!("PA{keep}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::scoring::ScoredResult;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn parents(sources: &[&str]) -> Vec<Scored> {
        sources
            .iter()
            .enumerate()
            .map(|(i, source)| Scored {
                genome: Genome::parse(source).unwrap(),
                result: ScoredResult {
                    score: f64::from(u32::try_from(i).unwrap()),
                    expected: String::new(),
                    found: String::new(),
                },
            })
            .collect()
    }

    fn breeding(config: &MutationConfig) -> Breeding<'_> {
        Breeding {
            crossover: CrossoverStrategy::Chromosomes,
            mutation: MutationStrategy::All,
            config,
        }
    }

    #[test]
    fn test_exact_size_and_kept_parents() {
        let mut rng = SmallRng::seed_from_u64(1);
        let config = MutationConfig::default();
        let selected = parents(&["+++", "---", "<<<", ">>>"]);
        for (_, strategy) in ReproductionStrategy::named() {
            for target in [4, 5, 10, 37] {
                let next = strategy
                    .reproduce(&selected, target, &breeding(&config), &mut rng)
                    .unwrap();
                assert_eq!(next.len(), target, "{}", strategy.code());
                if strategy.keeps_parents() {
                    for parent in &selected {
                        assert!(next.contains(&parent.genome));
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_parent() {
        let mut rng = SmallRng::seed_from_u64(2);
        let config = MutationConfig {
            mutation_rate: 0.0,
            ..MutationConfig::default()
        };
        let selected = parents(&["+.+."]);
        for (_, strategy) in ReproductionStrategy::named() {
            let next = strategy
                .reproduce(&selected, 6, &breeding(&config), &mut rng)
                .unwrap();
            assert_eq!(next.len(), 6);
            assert!(next.iter().all(|g| g.source() == "+.+."));
        }
    }

    #[test]
    fn test_reproduction_errors() {
        let mut rng = SmallRng::seed_from_u64(3);
        let config = MutationConfig::default();
        let strategy = ReproductionStrategy::PairAll { keep_parents: true };

        assert!(matches!(
            strategy.reproduce(&[], 4, &breeding(&config), &mut rng),
            Err(EvoError::EmptyParents)
        ));
        let selected = parents(&["+", "-", "<"]);
        assert!(matches!(
            strategy.reproduce(&selected, 2, &breeding(&config), &mut rng),
            Err(EvoError::TargetTooSmall { target: 2, kept: 3 })
        ));
    }

    #[test]
    fn test_draw_pair_is_distinct() {
        let mut rng = SmallRng::seed_from_u64(4);
        let weights = [1.0, 1000.0, 1.0];
        for _ in 0..100 {
            let (a, b) = draw_pair(&weights, &mut rng);
            assert_ne!(a, b);
            assert!(a < 3 && b < 3);
        }
    }

    #[test]
    fn test_codes() {
        let codes: Vec<String> = ReproductionStrategy::named().into_iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec!["PR", "PRW", "PRP", "PRPW", "PA", "PAP"]);
    }
}
