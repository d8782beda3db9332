//! One generation of the evolutionary loop.
//!
//! A stepping strategy scores a population (in parallel, on the scoring
//! pool), detects exact solutions, selects parents and reproduces them into
//! the next population. Everything but scoring runs on the calling thread.

// Score distribution buckets are rounded scores
#![allow(clippy::cast_possible_truncation)]

use crate::error::{EvoError, Result};
use crate::gp::case::ResolvedCase;
use crate::gp::config::Specialization;
use crate::gp::genome::Genome;
use crate::gp::mutation::MutationConfig;
use crate::gp::pool::ScoringPool;
use crate::gp::registry::{Role, Strategy};
use crate::gp::reproduction::Breeding;
use crate::gp::scoring::{Scored, ScoredResult, ScoringConfig};
use crate::gp::selection::MIN_SELECTED;
use crate::vm::Executor;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything a generation needs besides the population and randomness.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// The case, resolved once for the whole generation.
    pub case: &'a ResolvedCase,
    /// Strategies pinned for this generation.
    pub specialization: &'a Specialization,
    /// Size of the next population.
    pub pop_size: usize,
    /// Scoring parameters.
    pub scoring: &'a ScoringConfig,
    /// Mutation parameters.
    pub mutation: &'a MutationConfig,
    /// Program runner.
    pub executor: &'a dyn Executor,
}

impl std::fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("case", self.case)
            .field("specialization", &self.specialization.id())
            .field("pop_size", &self.pop_size)
            .finish_non_exhaustive()
    }
}

impl StepContext<'_> {
    fn breeding(&self) -> Breeding<'_> {
        Breeding {
            crossover: self.specialization.crossover,
            mutation: self.specialization.mutate,
            config: self.mutation,
        }
    }
}

/// Result of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// Best score of the scored population.
    pub best_score: f64,
    /// Source of a best-scoring genome.
    pub best_source: String,
    /// Output of that genome.
    pub best_found: String,
    /// Expected output of the generation.
    pub expected: String,
    /// Rounded score to number of genomes.
    pub distribution: BTreeMap<i64, usize>,
    /// Sources of every genome that printed exactly the expected output,
    /// plus every genome sharing the best score when the best output is
    /// exact.
    pub winners: Vec<String>,
    /// The next population.
    pub population: Vec<Genome>,
    /// The scored population this generation consumed.
    pub scored: Vec<Scored>,
}

impl Generation {
    fn new(scored: Vec<Scored>, population: Vec<Genome>, expected: &str) -> Self {
        let best = scored.iter().max_by(|a, b| a.score().total_cmp(&b.score()));
        let best_score = best.map_or(f64::NEG_INFINITY, Scored::score);
        let best_source = best.map(|s| s.genome.source()).unwrap_or_default();
        let best_found = best.map(|s| s.result.found.clone()).unwrap_or_default();

        let mut distribution = BTreeMap::new();
        for member in &scored {
            *distribution.entry(member.score().round() as i64).or_insert(0) += 1;
        }

        // Every exact genome wins, even when a length malus ranks it below
        // the best score
        let best_is_exact = best.is_some_and(|b| b.result.is_exact());
        let winners: BTreeSet<String> = scored
            .iter()
            .filter(|s| s.result.is_exact() || (best_is_exact && s.score().total_cmp(&best_score).is_eq()))
            .map(|s| s.genome.source())
            .collect();

        Self {
            best_score,
            best_source,
            best_found,
            expected: expected.to_string(),
            distribution,
            winners: winners.into_iter().collect(),
            population,
            scored,
        }
    }

    /// Worst score of the scored population.
    #[must_use]
    pub fn worst_score(&self) -> f64 {
        self.scored.iter().map(Scored::score).fold(f64::INFINITY, f64::min)
    }

    /// Scores of the scored population, in population order.
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.scored.iter().map(Scored::score).collect()
    }

    fn log(&self, step_number: usize) {
        info!(
            "step {step_number}: best score {} ({} winner(s))",
            self.best_score,
            self.winners.len()
        );
        let head: Vec<(i64, usize)> = self.distribution.iter().rev().take(5).map(|(&s, &n)| (s, n)).collect();
        debug!("step {step_number}: distribution head {head:?}");
        debug!("step {step_number}: best {:?} printed {:?}", self.best_source, self.best_found);
    }
}

/// Score every genome of `population` on the pool, keeping order.
///
/// # Errors
///
/// Propagates scoring and pool errors.
pub fn score_population(
    population: &[Genome],
    ctx: &StepContext<'_>,
    pool: &mut ScoringPool,
) -> Result<Vec<Scored>> {
    let strategy = ctx.specialization.score;
    let results = pool.map(population, |genome| {
        strategy.score(genome, ctx.case, ctx.executor, ctx.scoring)
    })?;
    population
        .iter()
        .zip(results)
        .map(|(genome, result)| {
            Ok(Scored {
                genome: genome.clone(),
                result: result?,
            })
        })
        .collect()
}

fn select_parents<R: Rng + ?Sized>(scored: &[Scored], ctx: &StepContext<'_>, rng: &mut R) -> Result<Vec<Scored>> {
    let selected = ctx.specialization.select.select(scored, rng)?;
    if selected.len() < MIN_SELECTED {
        return Err(EvoError::SelectionUnderflow(selected.len()));
    }
    Ok(selected.into_iter().map(|i| scored[i].clone()).collect())
}

/// Stepping strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SteppingStrategy {
    /// Score, select, then reproduce to the population size.
    Diversity,
    /// Reproduce to twice the population size, score, select, then keep the
    /// best of the selection.
    CrossFirst,
}

impl SteppingStrategy {
    /// Run one generation on `population`.
    ///
    /// # Errors
    ///
    /// Returns an error if scoring fails, the population is too small to
    /// select from, selection yields fewer than two parents, or
    /// reproduction rejects the parents.
    pub fn step<R: Rng + ?Sized>(
        &self,
        population: &[Genome],
        ctx: &StepContext<'_>,
        pool: &mut ScoringPool,
        step_number: usize,
        rng: &mut R,
    ) -> Result<Generation> {
        let reproduce = ctx.specialization.reproduce;
        let generation = match self {
            Self::Diversity => {
                let scored = score_population(population, ctx, pool)?;
                let parents = select_parents(&scored, ctx, rng)?;
                let next = reproduce.reproduce(&parents, ctx.pop_size, &ctx.breeding(), rng)?;
                Generation::new(scored, next, &ctx.case.expected)
            }
            Self::CrossFirst => {
                let unscored: Vec<Scored> = population
                    .iter()
                    .map(|genome| Scored {
                        genome: genome.clone(),
                        result: ScoredResult::unscored(),
                    })
                    .collect();
                // Unscored members all weigh the same
                let offspring = reproduce.reproduce(&unscored, 2 * ctx.pop_size, &ctx.breeding(), rng)?;
                let scored = score_population(&offspring, ctx, pool)?;

                let mut kept = select_parents(&scored, ctx, rng)?;
                kept.sort_by(|a, b| b.score().total_cmp(&a.score()));
                kept.truncate(ctx.pop_size);
                let next = if kept.len() < ctx.pop_size {
                    reproduce
                        .keeping_parents()
                        .reproduce(&kept, ctx.pop_size, &ctx.breeding(), rng)?
                } else {
                    kept.into_iter().map(|s| s.genome).collect()
                };
                Generation::new(scored, next, &ctx.case.expected)
            }
        };
        generation.log(step_number);
        Ok(generation)
    }
}

impl Strategy for SteppingStrategy {
    const ROLE: Role = Role::Step;

    fn named() -> Vec<(String, Self)> {
        [Self::Diversity, Self::CrossFirst]
            .into_iter()
            .map(|s| (s.code(), s))
            .collect()
    }

    fn defaults() -> Vec<Self> {
        vec![Self::Diversity]
    }

    fn code(&self) -> String {
        match self {
            Self::Diversity => "DIV",
            Self::CrossFirst => "SCR",
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gp::config::Configuration;
    use crate::gp::pool::PoolConfig;
    use crate::vm::TapeMachine;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn hello() -> Genome {
        Genome::parse(&format!("{}.+.>{}.+.", "+".repeat(104), "+".repeat(32))).unwrap()
    }

    fn small_pool() -> ScoringPool {
        ScoringPool::new(PoolConfig {
            threads: 2,
            tasks_per_worker: 32,
        })
        .unwrap()
    }

    fn run_step(step: &str, population: &[Genome], pop_size: usize) -> Generation {
        run_step_with("IC", step, population, pop_size)
    }

    fn run_step_with(score: &str, step: &str, population: &[Genome], pop_size: usize) -> Generation {
        let mut rng = SmallRng::seed_from_u64(21);
        let config: Configuration = format!("score:{score} select:RSD step:{step}").parse().unwrap();
        let specialization = config.specialize(&mut rng).unwrap();
        let case = ResolvedCase {
            stdin: String::new(),
            expected: "hi !".into(),
        };
        let machine = TapeMachine::with_budget(100_000);
        let ctx = StepContext {
            case: &case,
            specialization: &specialization,
            pop_size,
            scoring: &ScoringConfig::default(),
            mutation: &MutationConfig::default(),
            executor: &machine,
        };
        specialization
            .step
            .step(population, &ctx, &mut small_pool(), 1, &mut rng)
            .unwrap()
    }

    fn population_with_hello(size: usize) -> Vec<Genome> {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut population = crate::gp::CreationStrategy::OrientedDiversity
            .create(size - 1, &mut rng)
            .unwrap();
        population.push(hello());
        population
    }

    fn scored(source: &str, score: f64, found: &str) -> Scored {
        Scored {
            genome: Genome::parse(source).unwrap(),
            result: ScoredResult {
                score,
                expected: "ab".into(),
                found: found.into(),
            },
        }
    }

    #[test]
    fn test_winners_share_the_best_score() {
        let members = vec![
            scored("+.", 100.0, "ab"),
            scored("-.", 100.0, "ab"),
            scored("+..", 90.0, "ab"),
            scored(">.", 50.0, "a"),
        ];
        let generation = Generation::new(members, Vec::new(), "ab");
        assert_eq!(generation.winners, vec!["+.".to_string(), "-.".to_string()]);
    }

    #[test]
    fn test_exact_genomes_win_below_the_best_score() {
        // A shorter inexact genome can outscore exact ones under a length malus
        let members = vec![
            scored("+.", 100.0, "aa"),
            scored("+++.", 95.0, "ab"),
            scored("+++++.", 93.0, "ab"),
        ];
        let generation = Generation::new(members, Vec::new(), "ab");
        assert_eq!(generation.winners, vec!["+++++.".to_string(), "+++.".to_string()]);
    }

    #[test]
    fn test_every_exact_genome_wins_under_length_malus() {
        let longer = Genome::parse(&format!("<<{}", hello().source())).unwrap();
        for score in ["ICM", "ICBM"] {
            let mut population = population_with_hello(30);
            population.push(longer.clone());
            let generation = run_step_with(score, "DIV", &population, 31);

            assert!(generation.winners.contains(&hello().source()), "{score}");
            assert!(generation.winners.contains(&longer.source()), "{score}");
        }
    }

    #[test]
    fn test_diversity_step() {
        let population = population_with_hello(40);
        let generation = run_step("DIV", &population, 40);

        assert_eq!(generation.population.len(), 40);
        assert_eq!(generation.scored.len(), 40);
        assert_eq!(generation.winners, vec![hello().source()]);
        assert!((generation.best_score - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(generation.best_found, "hi !");
        assert_eq!(generation.distribution.values().sum::<usize>(), 40);
        assert!(generation.worst_score() <= generation.best_score);
    }

    #[test]
    fn test_cross_first_step() {
        let population = population_with_hello(20);
        let generation = run_step("SCR", &population, 20);

        assert_eq!(generation.population.len(), 20);
        assert_eq!(generation.scored.len(), 40);
        assert_eq!(generation.expected, "hi !");
    }

    #[test]
    fn test_codes() {
        assert_eq!(SteppingStrategy::Diversity.code(), "DIV");
        assert_eq!(SteppingStrategy::CrossFirst.code(), "SCR");
    }
}
