use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use reqtrail::*;
use serde_json::json;
use std::hint::black_box;

fn default_config() -> SanitizationConfig {
    SanitizationConfig::builder().build().unwrap()
}

fn browser_headers() -> HeaderSnapshot {
    [
        ("Host", "shop.example.com"),
        ("User-Agent", "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36"),
        ("Accept", "text/html,application/xhtml+xml"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Cookie", "session=0123456789abcdef; theme=dark"),
        ("X-Forwarded-For", "203.0.113.7"),
        ("Referer", "https://shop.example.com/catalog"),
    ]
    .into_iter()
    .collect()
}

fn bench_header_sanitization(c: &mut Criterion) {
    let config = default_config();
    let sanitizer = HeaderSanitizer::new(&config);
    let snapshot = browser_headers();

    let mut group = c.benchmark_group("headers");

    group.bench_function("flatten", |b| {
        b.iter(|| HeaderSanitizer::flatten(black_box(&snapshot)))
    });

    group.bench_function("flatten_and_sanitize", |b| {
        b.iter(|| {
            let (flat, _) = HeaderSanitizer::flatten(black_box(&snapshot));
            sanitizer.sanitize(flat)
        })
    });

    group.bench_function("truncate_long_value", |b| {
        let value = "x".repeat(4096);
        b.iter(|| sanitizer.sanitize_value("X-Trace", black_box(value.clone())))
    });

    group.finish();
}

fn bench_body_params(c: &mut Criterion) {
    let config = default_config();
    let sanitizer = BodyParamSanitizer::new(&config);

    let mut group = c.benchmark_group("body_params");

    let login = json!({
        "_csrf": "token",
        "LoginForm": {"username": "u1", "password": "p1", "rememberMe": "1"}
    });
    group.bench_function("login_form", |b| {
        b.iter(|| sanitizer.sanitize(black_box(&login)))
    });

    for width in [10usize, 100] {
        let items: Vec<_> = (0..width)
            .map(|i| json!({"sku": i, "meta": {"password": "x", "tags": ["a", "b"]}}))
            .collect();
        let params = json!({ "Order": { "items": items } });

        group.bench_with_input(BenchmarkId::new("wide_order", width), &params, |b, params| {
            b.iter(|| sanitizer.sanitize(black_box(params)))
        });
    }

    group.finish();
}

fn bench_pattern_compile(c: &mut Criterion) {
    c.bench_function("mask_pattern_compile", |b| {
        b.iter(|| MaskPattern::compile(black_box("~^api[-_]?key$~i")))
    });
}

criterion_group!(
    benches,
    bench_header_sanitization,
    bench_body_params,
    bench_pattern_compile
);
criterion_main!(benches);
