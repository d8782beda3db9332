//! The run controller.
//!
//! A [`Run`] owns the populations, the configuration template and the
//! active specialization. It advances one generation per call and hands a
//! [`Continuation`] back to the caller, who decides whether to go on and may
//! swap the template in between.

use crate::error::{EvoError, Result};
use crate::gp::case::Case;
use crate::gp::config::{Configuration, Specialization};
use crate::gp::genome::Genome;
use crate::gp::mutation::MutationConfig;
use crate::gp::pool::{PoolConfig, ScoringPool};
use crate::gp::scoring::ScoringConfig;
use crate::gp::stats::{GenerationRecord, StatisticsSink};
use crate::gp::stepping::{Generation, StepContext};
use crate::vm::{Executor, TapeConfig};
use log::info;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Settings of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Number of independent populations.
    pub populations: usize,
    /// Genomes per population.
    pub pop_size: usize,
    /// Draw a new specialization every N generations.
    pub respecialize_every: usize,
    /// RNG seed; a random seed when absent.
    pub seed: Option<u64>,
    /// Scoring worker pool.
    pub pool: PoolConfig,
    /// Scoring parameters.
    pub scoring: ScoringConfig,
    /// Mutation parameters.
    pub mutation: MutationConfig,
    /// Reference interpreter parameters.
    pub tape: TapeConfig,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            populations: 1,
            pop_size: 400,
            respecialize_every: 10,
            seed: None,
            pool: PoolConfig::default(),
            scoring: ScoringConfig::default(),
            mutation: MutationConfig::default(),
            tape: TapeConfig::default(),
        }
    }
}

impl RunSettings {
    /// Load settings from a JSON file. Missing fields take their default.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::InvalidSettings`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.populations == 0 {
            return Err(EvoError::InvalidSettings("at least one population is required".into()));
        }
        if self.pop_size < 2 {
            return Err(EvoError::InvalidSettings(format!(
                "pop_size {} is too small, at least 2 genomes are required",
                self.pop_size
            )));
        }
        if self.respecialize_every == 0 {
            return Err(EvoError::InvalidSettings("respecialize_every must be positive".into()));
        }
        if self.scoring.max_output_size == 0 {
            return Err(EvoError::InvalidSettings("max_output_size must be positive".into()));
        }
        self.mutation.validate()
    }
}

/// Token allowing the caller to continue a run after a step.
///
/// A continuation is only valid for the step that follows the one that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Continuation {
    next_step: usize,
}

impl Continuation {
    /// Number of the step this continuation resumes.
    #[must_use]
    pub fn next_step(&self) -> usize {
        self.next_step
    }
}

/// Result of one step of a run.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// One generation per population, in population order.
    pub generations: Vec<Generation>,
    /// Token to resume the run with.
    pub continuation: Continuation,
}

/// An evolutionary run.
pub struct Run<E: Executor> {
    case: Case,
    template: Configuration,
    settings: RunSettings,
    executor: E,
    pool: ScoringPool,
    rng: SmallRng,
    specialization: Specialization,
    respecialize: bool,
    specialized_for: Option<usize>,
    populations: Vec<Vec<Genome>>,
    step_number: usize,
    found_solutions: BTreeSet<String>,
    sink: Option<Box<dyn StatisticsSink>>,
}

impl<E: Executor> fmt::Debug for Run<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("case", &self.case)
            .field("template", &self.template.to_string())
            .field("specialization", &self.specialization.id())
            .field("step_number", &self.step_number)
            .field("populations", &self.populations.len())
            .field("found_solutions", &self.found_solutions)
            .finish_non_exhaustive()
    }
}

impl<E: Executor> Run<E> {
    /// Start a run: draw a specialization and create the populations with
    /// its creation strategy.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid settings, an empty role in `template`,
    /// or a scoring pool that cannot be built.
    pub fn new(case: Case, template: Configuration, settings: RunSettings, executor: E) -> Result<Self> {
        settings.validate()?;
        let mut rng = settings
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        let specialization = template.specialize(&mut rng)?;
        let populations = (0..settings.populations)
            .map(|_| specialization.create.create(settings.pop_size, &mut rng))
            .collect::<Result<Vec<_>>>()?;
        Self::assemble(case, template, settings, executor, rng, specialization, populations)
    }

    /// Start a run from existing populations.
    ///
    /// `settings.populations` is taken from `populations`; every population must hold
    /// `settings.pop_size` genomes.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid settings, mis-sized populations, an
    /// empty role in `template`, or a scoring pool that cannot be built.
    pub fn with_populations(
        case: Case,
        template: Configuration,
        mut settings: RunSettings,
        executor: E,
        populations: Vec<Vec<Genome>>,
    ) -> Result<Self> {
        settings.validate()?;
        if populations.is_empty() {
            return Err(EvoError::InvalidSettings("at least one population is required".into()));
        }
        if let Some(bad) = populations.iter().find(|p| p.len() != settings.pop_size) {
            return Err(EvoError::InvalidSettings(format!(
                "population of {} genomes, expected {}",
                bad.len(),
                settings.pop_size
            )));
        }
        let mut rng = settings
            .seed
            .map_or_else(SmallRng::from_entropy, SmallRng::seed_from_u64);
        let specialization = template.specialize(&mut rng)?;
        settings.populations = populations.len();
        Self::assemble(case, template, settings, executor, rng, specialization, populations)
    }

    fn assemble(
        case: Case,
        template: Configuration,
        settings: RunSettings,
        executor: E,
        rng: SmallRng,
        specialization: Specialization,
        populations: Vec<Vec<Genome>>,
    ) -> Result<Self> {
        let pool = ScoringPool::new(settings.pool)?;
        info!(
            "starting {} population(s) of {} with {}",
            populations.len(),
            settings.pop_size,
            specialization
        );
        Ok(Self {
            case,
            template,
            settings,
            executor,
            pool,
            rng,
            specialization,
            respecialize: false,
            specialized_for: None,
            populations,
            step_number: 1,
            found_solutions: BTreeSet::new(),
            sink: None,
        })
    }

    /// Send generation statistics to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn StatisticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current populations.
    #[must_use]
    pub fn populations(&self) -> &[Vec<Genome>] {
        &self.populations
    }

    /// Sources of every exact solution found so far.
    #[must_use]
    pub fn found_solutions(&self) -> &BTreeSet<String> {
        &self.found_solutions
    }

    /// Number of the next step, starting at 1.
    #[must_use]
    pub fn step_number(&self) -> usize {
        self.step_number
    }

    /// The active specialization.
    #[must_use]
    pub fn specialization(&self) -> &Specialization {
        &self.specialization
    }

    /// The configuration template specializations are drawn from.
    #[must_use]
    pub fn template(&self) -> &Configuration {
        &self.template
    }

    /// The run settings.
    #[must_use]
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Token resuming the run at its current step.
    #[must_use]
    pub fn continuation(&self) -> Continuation {
        Continuation {
            next_step: self.step_number,
        }
    }

    /// Advance every population by one generation.
    ///
    /// A specialization drawn for this step is kept even if the step fails,
    /// so a retry steps under the same strategies. Populations, found
    /// solutions and the step number only change once every population has
    /// stepped and every record reached the sink. Records sent before a
    /// sink error are not retracted, so a retry may send them again.
    ///
    /// # Errors
    ///
    /// Propagates stepping and statistics errors.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let scheduled = (self.step_number - 1).is_multiple_of(self.settings.respecialize_every)
            && self.specialized_for != Some(self.step_number);
        if self.respecialize || scheduled {
            self.specialization = self.template.specialize(&mut self.rng)?;
            self.respecialize = false;
            self.specialized_for = Some(self.step_number);
            info!("step {}: specialized to {}", self.step_number, self.specialization);
        }

        let case = self.case.resolve(&mut self.rng);
        let ctx = StepContext {
            case: &case,
            specialization: &self.specialization,
            pop_size: self.settings.pop_size,
            scoring: &self.settings.scoring,
            mutation: &self.settings.mutation,
            executor: &self.executor,
        };

        let mut generations = Vec::with_capacity(self.populations.len());
        for population in &self.populations {
            let generation = self
                .specialization
                .step
                .step(population, &ctx, &mut self.pool, self.step_number, &mut self.rng)?;
            generations.push(generation);
        }

        if let Some(sink) = self.sink.as_mut() {
            let id = self.specialization.id();
            for (idx, generation) in generations.iter().enumerate() {
                sink.record(&GenerationRecord::new(self.step_number, idx, generation, id.clone()))?;
            }
        }

        for winner in generations.iter().flat_map(|g| &g.winners) {
            if self.found_solutions.insert(winner.clone()) {
                info!("step {}: found solution {winner:?}", self.step_number);
            }
        }
        self.populations = generations.iter().map(|g| g.population.clone()).collect();
        self.step_number += 1;
        Ok(StepOutcome {
            generations,
            continuation: self.continuation(),
        })
    }

    /// Continue the run after the step that produced `continuation`.
    ///
    /// A new template replaces the current one and forces a new
    /// specialization before the step.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::StaleContinuation`] if `continuation` does not
    /// resume the current step, and propagates [`Run::step`] errors.
    pub fn resume(&mut self, continuation: Continuation, template: Option<Configuration>) -> Result<StepOutcome> {
        if continuation.next_step != self.step_number {
            return Err(EvoError::StaleContinuation {
                expected: self.step_number,
                found: continuation.next_step,
            });
        }
        if let Some(template) = template {
            info!("step {}: new template {template}", self.step_number);
            self.template = template;
            self.respecialize = true;
        }
        self.step()
    }

    /// Step until `max_generations` steps ran or `until` returns true.
    ///
    /// Returns the number of steps run.
    ///
    /// # Errors
    ///
    /// Propagates [`Run::step`] errors.
    pub fn run<F>(&mut self, max_generations: usize, mut until: F) -> Result<usize>
    where
        F: FnMut(&StepOutcome) -> bool,
    {
        let mut continuation = self.continuation();
        for done in 1..=max_generations {
            let outcome = self.resume(continuation, None)?;
            if until(&outcome) {
                return Ok(done);
            }
            continuation = outcome.continuation;
        }
        Ok(max_generations)
    }
}
