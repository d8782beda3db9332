//! Benchmarks for genome execution and scoring.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use evotape::gp::{
    Configuration, CreationStrategy, Genome, MutationConfig, PoolConfig, ResolvedCase, ScoringConfig,
    ScoringPool, ScoringStrategy, StepContext, score_population,
};
use evotape::vm::{CachedExecutor, Executor, TapeMachine};
use rand::SeedableRng;
use rand::rngs::SmallRng;

fn hello() -> Genome {
    Genome::parse(&format!("{}.+.>{}.+.", "+".repeat(104), "+".repeat(32))).unwrap()
}

fn case() -> ResolvedCase {
    ResolvedCase {
        stdin: String::new(),
        expected: "hi !".into(),
    }
}

fn bench_execute(c: &mut Criterion) {
    let machine = TapeMachine::default();
    let source = hello().source();
    // Tight loop that only stops on the instruction budget
    let looping = "+[>+<]";

    c.bench_function("execute_hello", |b| {
        b.iter(|| black_box(machine.execute(black_box(&source), "", 32)));
    });
    c.bench_function("execute_budget_exhausted", |b| {
        b.iter(|| black_box(machine.execute(black_box(looping), "", 32)));
    });
}

fn bench_score(c: &mut Criterion) {
    let machine = TapeMachine::default();
    let genome = hello();
    let case = case();
    let scoring = ScoringConfig::default();

    c.bench_function("score_io_comparison", |b| {
        b.iter(|| {
            ScoringStrategy::IO_COMPARISON
                .score(black_box(&genome), &case, &machine, &scoring)
                .unwrap()
        });
    });
}

fn bench_score_population(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let population = CreationStrategy::OrientedDiversity.create(400, &mut rng).unwrap();
    let specialization = "score:IC".parse::<Configuration>().unwrap().specialize(&mut rng).unwrap();
    let case = case();
    let scoring = ScoringConfig::default();
    let mutation = MutationConfig::default();
    let mut pool = ScoringPool::new(PoolConfig::default()).unwrap();

    let mut group = c.benchmark_group("score_population");
    group.sample_size(20);

    let machine = TapeMachine::default();
    group.bench_function("uncached", |b| {
        let ctx = StepContext {
            case: &case,
            specialization: &specialization,
            pop_size: population.len(),
            scoring: &scoring,
            mutation: &mutation,
            executor: &machine,
        };
        b.iter(|| score_population(black_box(&population), &ctx, &mut pool).unwrap());
    });

    let cached = CachedExecutor::new(TapeMachine::default());
    group.bench_function("cached", |b| {
        let ctx = StepContext {
            case: &case,
            specialization: &specialization,
            pop_size: population.len(),
            scoring: &scoring,
            mutation: &mutation,
            executor: &cached,
        };
        b.iter(|| score_population(black_box(&population), &ctx, &mut pool).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_execute, bench_score, bench_score_population);
criterion_main!(benches);
