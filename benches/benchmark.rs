use criterion::{black_box, criterion_group, criterion_main, Criterion};
use site_capture::{
    classify, get_chrome_args, CaptureError, ClassifiedError, Config, ProfileTable, QualityTier,
    RenderRequest, ResolvedParameters, WaitPolicy,
};
use std::time::Duration;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn benchmark_wait_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("wait_policy");
    configure_fast_group(&mut group);

    let policy = WaitPolicy::default();
    let test_urls = vec![
        ("https://www.github.com/rust-lang/rust", Some(500)),
        ("https://example.com/path", Some(3000)),
        ("https://example.com", None),
        ("not a url", Some(20_000)),
    ];

    group.bench_function("resolve_wait", |b| {
        b.iter(|| {
            for (url, hint) in &test_urls {
                black_box(policy.resolve_wait(url, *hint));
            }
        });
    });

    group.finish();
}

fn benchmark_profile_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("profiles");
    configure_fast_group(&mut group);

    let table = ProfileTable::default();
    let names = vec![Some("standard"), Some("RETINA"), Some("ultra"), None];

    group.bench_function("resolve_tier", |b| {
        b.iter(|| {
            for tier in QualityTier::ALL {
                black_box(table.resolve(tier));
            }
        });
    });

    group.bench_function("resolve_name", |b| {
        b.iter(|| {
            for name in &names {
                black_box(table.resolve_name(*name));
            }
        });
    });

    group.finish();
}

fn benchmark_request_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_request");
    configure_fast_group(&mut group);

    let config = Config::default();
    let body = r#"{"url":"https://www.notion.so/page","quality":"retina","wait":800,"fullPage":true,"removeAds":false}"#;

    group.bench_function("parse_and_resolve", |b| {
        b.iter(|| {
            let request: RenderRequest = serde_json::from_str(black_box(body)).unwrap();
            let _ = black_box(request.validate());
            black_box(ResolvedParameters::resolve(&request, &config));
        });
    });

    group.finish();
}

fn benchmark_error_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("error_classification");
    configure_fast_group(&mut group);

    let errors = vec![
        CaptureError::MissingUrl,
        CaptureError::NavigationTimeout(Duration::from_secs(20)),
        CaptureError::CaptureFailed("target closed".to_string()),
    ];
    let messages = vec![
        "Invalid URL format: relative URL without a base",
        "Request Timeout while waiting for frame",
        "Protocol error: Target closed",
    ];

    group.bench_function("classify", |b| {
        b.iter(|| {
            for error in &errors {
                black_box(classify(error));
            }
        });
    });

    group.bench_function("from_message", |b| {
        b.iter(|| {
            for message in &messages {
                black_box(ClassifiedError::from_message(*message));
            }
        });
    });

    group.finish();
}

fn benchmark_chrome_args(c: &mut Criterion) {
    let mut group = c.benchmark_group("chrome_args");
    configure_fast_group(&mut group);

    let config = Config {
        extra_chrome_args: vec!["--lang=en-US".to_string()],
        ..Default::default()
    };

    group.bench_function("build", |b| {
        b.iter(|| black_box(get_chrome_args(&config)));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_wait_resolution,
    benchmark_profile_lookup,
    benchmark_request_parsing,
    benchmark_error_classification,
    benchmark_chrome_args
);
criterion_main!(benches);
