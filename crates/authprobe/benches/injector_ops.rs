//! Injector and Locator Benchmarks
//!
//! Benchmarks for override script generation and selector query building.
//!
//! Run with: `cargo bench --bench injector_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use authprobe::prelude::*;
use authprobe::{CredentialMode, NetworkMode, ScriptBuilder};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_script_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("script_generation");

    let cases = vec![
        ("passthrough", RuntimeOverrides::default()),
        ("failure", RuntimeOverrides::default().with_failure_mode()),
        ("lockout", RuntimeOverrides::default().with_lockout_after(3)),
        ("denied", RuntimeOverrides::default().with_permissions_denied()),
        (
            "offline",
            RuntimeOverrides::default().with_network(NetworkMode::interrupted()),
        ),
        (
            "chained",
            RuntimeOverrides::default()
                .with_credentials(CredentialMode::Success)
                .with_network(NetworkMode::interrupted())
                .without_indicator(),
        ),
    ];

    for (name, overrides) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &overrides, |bench, o| {
            bench.iter(|| {
                let script = ScriptBuilder::new(black_box(o)).build();
                black_box(script.line_count);
            });
        });
    }

    group.finish();
}

fn bench_selector_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_queries");

    let selectors = vec![
        ("id", catalog::BIOMETRIC_USERNAME),
        ("test_id", catalog::FACE_AUTH),
        ("xpath", catalog::TAB_BIOMETRIC_STATEFUL),
        ("text", catalog::STATUS_SUCCESS),
        ("text_contains", catalog::STATUS_LOCKED),
    ];

    for (name, selector) in selectors {
        group.bench_with_input(BenchmarkId::from_parameter(name), &selector, |bench, s| {
            bench.iter(|| black_box(s.to_query()));
        });
    }

    group.finish();
}

fn bench_mock_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let mut driver = MockDriver::new();
    driver.navigate_to_login();

    c.bench_function("mock_primary_lookup", |bench| {
        bench.iter(|| {
            rt.block_on(async {
                black_box(driver.query(&catalog::BIOMETRIC_REGISTER).await.unwrap());
            });
        });
    });
}

criterion_group!(
    benches,
    bench_script_generation,
    bench_selector_queries,
    bench_mock_lookup
);
criterion_main!(benches);
