use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use ranklearn::benchmarks::config;
use ranklearn::prelude::*;
use ranklearn_datasets::generate::sparse_binary_matrix;
use ranklearn_localauc::{Estimator, MaxLocalAuc};

fn fit_bench(c: &mut Criterion) {
    let mut rng = Xoshiro256Plus::seed_from_u64(40);
    let shapes = [(100, 200), (400, 800)];

    let mut benchmark = c.benchmark_group("max_local_auc");
    config::set_default_benchmark_configs(&mut benchmark);

    for &shape in shapes.iter() {
        let (x, _, _) = sparse_binary_matrix(shape, 8, 0.95, &mut rng);
        let id = format!("{}x{}", shape.0, shape.1);

        for &derivative in [Estimator::Sampled, Estimator::Exact].iter() {
            if derivative == Estimator::Exact && shape.0 > 100 {
                continue;
            }
            let params = MaxLocalAuc::params(10)
                .derivative(derivative)
                .max_iterations(5)
                .eps(1e-12);

            benchmark.bench_with_input(
                BenchmarkId::new(derivative.name(), &id),
                &x,
                |bencher, x| bencher.iter(|| params.fit(black_box(x)).unwrap()),
            );
        }
    }

    benchmark.finish();
}

#[cfg(not(target_os = "windows"))]
criterion_group! {
    name = benches;
    config = config::get_default_profiling_configs();
    targets = fit_bench
}
#[cfg(target_os = "windows")]
criterion_group!(benches, fit_bench);

criterion_main!(benches);
