//! Run command implementation.

use super::{CliError, Recipe};
use evotape::gp::{JsonLinesSink, StepOutcome};
use evotape::{CachedExecutor, Case, Configuration, Run, RunSettings, TapeMachine};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments of the run command.
#[derive(clap::Args, Debug)]
pub(crate) struct RunArgs {
    /// Output the evolved program must print
    #[arg(short, long)]
    expected: String,

    /// Standard input given to every program
    #[arg(long, default_value = "")]
    stdin: String,

    /// Strategy configuration, e.g. "score:IC select:PLMD,RSD" (overrides --recipe)
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in configuration template
    #[arg(long, value_enum, default_value = "best")]
    recipe: Recipe,

    /// JSON settings file (missing fields take their default)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Genomes per population
    #[arg(short = 'n', long)]
    pop_size: Option<usize>,

    /// Number of independent populations
    #[arg(long)]
    populations: Option<usize>,

    /// Maximum number of generations (default: 1000)
    #[arg(short, long, default_value = "1000")]
    generations: usize,

    /// Random seed (default: random)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Scoring threads (default: 16)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Write per-generation statistics as JSON lines to this file
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Keep evolving after the first exact solution
    #[arg(long)]
    keep_going: bool,

    /// Show progress bar
    #[arg(short, long)]
    progress: bool,
}

impl RunArgs {
    fn settings(&self) -> Result<RunSettings, CliError> {
        let mut settings = match &self.settings {
            Some(path) => RunSettings::from_json_file(path)
                .map_err(|e| CliError::new(format!("Failed to load {}: {e}", path.display())))?,
            None => RunSettings::default(),
        };
        if let Some(pop_size) = self.pop_size {
            settings.pop_size = pop_size;
        }
        if let Some(populations) = self.populations {
            settings.populations = populations;
        }
        if let Some(threads) = self.threads {
            settings.pool.threads = threads;
        }
        if self.seed.is_some() {
            settings.seed = self.seed;
        }
        Ok(settings)
    }

    fn template(&self) -> Result<Configuration, CliError> {
        match &self.config {
            Some(text) => Ok(text.parse()?),
            None => Ok(self.recipe.configuration()),
        }
    }
}

fn progress_bar(enabled: bool, generations: usize) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(u64::try_from(generations).unwrap_or(u64::MAX));
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} generations {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the settings or configuration are invalid, the
/// statistics file cannot be written, or a generation fails.
pub(crate) fn execute(args: &RunArgs) -> Result<(), CliError> {
    let settings = args.settings()?;
    let template = args.template()?;
    let executor = CachedExecutor::new(TapeMachine::new(settings.tape));
    let case = Case::new(args.stdin.as_str(), args.expected.as_str());

    let mut run = Run::new(case, template, settings, executor)?;
    if let Some(path) = &args.stats {
        let file = File::create(path)
            .map_err(|e| CliError::new(format!("Failed to create {}: {e}", path.display())))?;
        run = run.with_sink(Box::new(JsonLinesSink::new(BufWriter::new(file))));
    }

    println!("Evolving programs printing {:?}", args.expected);
    println!("  Template: {}", run.template());
    println!(
        "  Populations: {} x {}",
        run.settings().populations,
        run.settings().pop_size
    );

    let pb = progress_bar(args.progress, args.generations);
    let start = Instant::now();
    let mut best: Option<(f64, String)> = None;
    let keep_going = args.keep_going;

    let steps = run.run(args.generations, |outcome: &StepOutcome| {
        for generation in &outcome.generations {
            if best.as_ref().is_none_or(|(score, _)| generation.best_score > *score) {
                best = Some((generation.best_score, generation.best_source.clone()));
            }
        }
        if let Some((score, _)) = &best {
            pb.set_message(format!("best {score}"));
        }
        pb.inc(1);
        !keep_going && outcome.generations.iter().any(|g| !g.winners.is_empty())
    })?;
    pb.finish_and_clear();

    println!();
    println!("Ran {steps} generation(s) in {:.2?}", start.elapsed());
    println!("  Last specialization: {}", run.specialization());
    if run.found_solutions().is_empty() {
        println!("  No exact solution found");
        if let Some((score, source)) = best {
            println!("  Best score: {score}");
            println!("  Best program: {source}");
        }
    } else {
        println!("  Solutions ({}):", run.found_solutions().len());
        for source in run.found_solutions() {
            println!("    {source}");
        }
    }

    Ok(())
}
