use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use garden_core::{CivilDate, Contact, GardenEngine, ImportanceTier, LayoutMode, forecast, layout};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn population(n: usize, now: CivilDate) -> Vec<Contact> {
    let mut rng = SmallRng::seed_from_u64(42);
    (0..n)
        .map(|i| {
            let tier = match rng.random_range(0..3) {
                0 => ImportanceTier::High,
                1 => ImportanceTier::Medium,
                _ => ImportanceTier::Low,
            };
            Contact::new(&format!("c{i:06}"), "bench")
                .with_importance(tier)
                .with_target(rng.random_range(7..90))
                .with_last_interaction(now.add_days(-rng.random_range(0..365)))
        })
        .collect()
}

fn bench_layout(c: &mut Criterion) {
    let now = CivilDate::from_days(20_000);
    let mut group = c.benchmark_group("layout");
    for n in [100, 1_000, 10_000] {
        let contacts = population(n, now);
        group.bench_with_input(BenchmarkId::new("uncached", n), &contacts, |b, contacts| {
            b.iter(|| layout(black_box(contacts), now, LayoutMode::Tier, None))
        });
        let mut engine = GardenEngine::default();
        group.bench_with_input(BenchmarkId::new("memoized", n), &contacts, |b, contacts| {
            b.iter(|| engine.layout(black_box(contacts), now, LayoutMode::Tier, None))
        });
    }
    group.finish();
}

fn bench_forecast(c: &mut Criterion) {
    let now = CivilDate::from_days(20_000);
    let contacts = population(10_000, now);
    c.bench_function("forecast_10k", |b| {
        b.iter(|| forecast(black_box(&contacts), now, 30, 12))
    });
}

criterion_group!(benches, bench_layout, bench_forecast);
criterion_main!(benches);
