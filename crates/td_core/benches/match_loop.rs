//! Match loop benchmarks for td_core.
//!
//! Run with: `cargo bench -p td_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use td_core::config::GameConfig;
use td_core::scenario::ScenarioState;
use td_test_utils::fixtures::{fixed_f, scenario_of, three_wave_config, MatchFixture};

/// Crowded board: many enemies walking at once.
fn crowded_config() -> GameConfig {
    GameConfig {
        starting_health: 1_000,
        prepare_seconds: fixed_f(0.0),
        scenario: scenario_of(&[50, 50, 50], 0.1),
        ..GameConfig::default()
    }
}

pub fn match_loop_benchmark(c: &mut Criterion) {
    c.bench_function("full_match_three_waves", |b| {
        b.iter_batched(
            || {
                let mut fixture = MatchFixture::new(three_wave_config());
                fixture.start();
                fixture
            },
            |mut fixture| black_box(fixture.run_to_end(10_000)),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("tick_crowded_board", |b| {
        let mut fixture = MatchFixture::new(crowded_config());
        fixture.start();
        for _ in 0..200 {
            fixture.controller.tick();
        }
        b.iter(|| black_box(fixture.controller.tick()));
    });

    c.bench_function("scenario_progress_to_exhaustion", |b| {
        let scenario = crowded_config().scenario;
        b.iter_batched(
            || {
                let mut state = ScenarioState::new(scenario.clone()).unwrap();
                state.begin().unwrap();
                (state, Vec::with_capacity(150))
            },
            |(mut state, mut requests)| {
                while state.progress(fixed_f(0.05), &mut requests) {}
                black_box(requests.len())
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, match_loop_benchmark);
criterion_main!(benches);
