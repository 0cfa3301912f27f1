use std::time::Instant;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use fluentsim::domains::{elevators, recon};
use fluentsim::{Action, EngineConfig, Episode, NoopPolicy, RolloutConfig, RolloutPool};

fn bench_ground_recon(c: &mut Criterion) {
    let domain = recon::domain();
    let instance = recon::instance();
    c.bench_function("rollout/ground_recon", |b| {
        b.iter(|| fluentsim::ground(&domain, &instance).unwrap());
    });
}

fn bench_recon_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");
    group.throughput(Throughput::Elements(1));

    group.bench_function("recon_patrol", |b| {
        b.iter_custom(|iters| {
            // Fresh episode per sample so the horizon never cuts a sample short.
            let model = recon::model().unwrap();
            let config = EngineConfig::default().with_horizon(u32::MAX);
            let mut episode = Episode::new(model, &config).unwrap();
            episode.reset_with_seed(7);

            let moves = ["right", "up", "left", "down"];
            let start = Instant::now();
            for i in 0..iters {
                let dir = moves[usize::try_from(i % 4).unwrap()];
                episode.step(&Action::noop().with(dir, &["a1"], true)).unwrap();
            }
            start.elapsed()
        });
    });

    group.bench_function("elevators_noop", |b| {
        b.iter_custom(|iters| {
            let model = elevators::model().unwrap();
            let config = EngineConfig::default().with_horizon(u32::MAX);
            let mut episode = Episode::new(model, &config).unwrap();
            episode.reset_with_seed(7);

            let start = Instant::now();
            for _ in 0..iters {
                episode.step(&Action::noop()).unwrap();
            }
            start.elapsed()
        });
    });
    group.finish();
}

fn bench_rollout_pool(c: &mut Criterion) {
    const EPISODES: usize = 64;
    let mut group = c.benchmark_group("rollout_pool");
    group.throughput(Throughput::Elements(EPISODES as u64));

    for workers in [1, 4] {
        group.bench_function(format!("elevators_{workers}_workers"), |b| {
            let config = RolloutConfig {
                workers,
                ..RolloutConfig::default()
            };
            let pool = RolloutPool::new(elevators::model().unwrap(), EngineConfig::default(), config).unwrap();
            b.iter(|| pool.evaluate(EPISODES, || NoopPolicy).unwrap());
        });
    }
    group.finish();
}

criterion_group!(rollout, bench_ground_recon, bench_recon_step, bench_rollout_pool);
criterion_main!(rollout);
