use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mtm_rs::kernel::KernelLifecycle;
use mtm_rs::signal::multitaper::{MtmCoherenceConfig, MtmCoherenceKernel};
use mtm_rs::signal::traits::MtmCoherence1D;
use mtm_rs::signal::windows::dpss;
use rand::Rng;

fn noisy_pair(len: usize, lag: usize) -> (Vec<f64>, Vec<f64>) {
    let mut rng = rand::rng();
    let base: Vec<f64> = (0..len + lag)
        .map(|i| (0.2 * i as f64).sin() + rng.random_range(-0.5..0.5))
        .collect();
    let x = base[lag..].to_vec();
    let y: Vec<f64> = base[..len]
        .iter()
        .map(|v| v + rng.random_range(-0.5..0.5))
        .collect();
    (x, y)
}

fn dpss_1024(c: &mut Criterion) {
    c.bench_function("dpss_1024_nw4", |b| {
        b.iter(|| {
            black_box(dpss(1024, 4.0, 7).expect("benchmark input should satisfy dpss preconditions"));
        });
    });
}

fn mtm_coherence_4096(c: &mut Criterion) {
    let (x, y) = noisy_pair(4096, 5);
    let kernel = MtmCoherenceKernel::try_new(MtmCoherenceConfig {
        nw: 4.0,
        ..Default::default()
    })
    .expect("valid coherence kernel config");

    c.bench_function("mtm_coherence_4096", |b| {
        b.iter(|| {
            black_box(
                kernel
                    .run_alloc(x.as_slice(), y.as_slice())
                    .expect("benchmark input should satisfy coherence preconditions"),
            );
        });
    });
}

fn mtm_coherence_bias_corrected_4096(c: &mut Criterion) {
    let (x, y) = noisy_pair(4096, 5);
    let kernel = MtmCoherenceKernel::try_new(MtmCoherenceConfig {
        nw: 4.0,
        bias_correction: true,
        ..Default::default()
    })
    .expect("valid coherence kernel config");

    c.bench_function("mtm_coherence_bias_corrected_4096", |b| {
        b.iter(|| {
            black_box(
                kernel
                    .run_alloc(x.as_slice(), y.as_slice())
                    .expect("benchmark input should satisfy coherence preconditions"),
            );
        });
    });
}

fn mtm_coherence_monte_carlo_512(c: &mut Criterion) {
    let (x, y) = noisy_pair(512, 3);
    let kernel = MtmCoherenceKernel::try_new(MtmCoherenceConfig {
        nw: 4.0,
        bias_correction: true,
        confidence_iterations: 50,
        seed: Some(7),
        ..Default::default()
    })
    .expect("valid coherence kernel config");

    let mut group = c.benchmark_group("monte_carlo");
    group.sample_size(10);
    group.bench_function("mtm_coherence_mc50_512", |b| {
        b.iter(|| {
            black_box(
                kernel
                    .run_alloc(x.as_slice(), y.as_slice())
                    .expect("benchmark input should satisfy coherence preconditions"),
            );
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    dpss_1024,
    mtm_coherence_4096,
    mtm_coherence_bias_corrected_4096,
    mtm_coherence_monte_carlo_512
);
criterion_main!(benches);
