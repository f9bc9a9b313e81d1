//! 라인 분류 벤치마크
//!
//! 내장 카탈로그 기준 단일 라인 분류, 카테고리 판정, 카탈로그 크기 스케일링을 측정합니다.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tracesentry_core::types::RiskTier;
use tracesentry_engine::{LineCategory, LineClassifier, RuleCatalog, RuleSpec};

const LINES: &[(&str, &str)] = &[
    ("high_passwd", r#"openat(AT_FDCWD, "/etc/passwd", O_RDONLY) = 3"#),
    (
        "medium_dns",
        "connect(3, {sa_family=AF_INET, sin_port=htons(53)}, 16) = 0",
    ),
    ("low_stdout", r#"write(1, "hello\n", 6) = 6"#),
    ("no_match", "brk(NULL) = 0x55d0c6a2e000"),
    (
        "spawn",
        r#"[pid  4242] execve("/usr/bin/true", ["true"], 0x7ffc /* 12 vars */) = 0"#,
    ),
];

fn bench_classify(c: &mut Criterion) {
    let classifier = LineClassifier::new(Arc::new(RuleCatalog::builtin().unwrap()));
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(1));

    for (name, line) in LINES {
        group.bench_function(*name, |b| {
            b.iter(|| classifier.classify(black_box(line)).len());
        });
    }

    group.finish();
}

fn bench_first_high(c: &mut Criterion) {
    let classifier = LineClassifier::new(Arc::new(RuleCatalog::builtin().unwrap()));
    let line = r#"openat(AT_FDCWD, "/etc/shadow", O_WRONLY|O_CREAT) = 3"#;

    c.bench_function("first_high_match", |b| {
        b.iter(|| {
            classifier
                .matches(black_box(line))
                .find(|m| m.tier == RiskTier::High)
                .is_some()
        });
    });
}

fn bench_category(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_category");
    group.throughput(Throughput::Elements(1));

    for (name, line) in LINES {
        group.bench_function(*name, |b| b.iter(|| LineCategory::of(black_box(line))));
    }

    group.finish();
}

fn bench_catalog_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_scaling");
    let line = "connect(3, {sa_family=AF_INET, sin_port=htons(443)}, 16) = 0";

    for extra in [0usize, 50, 200] {
        let specs = (0..extra).map(|i| {
            RuleSpec::new(
                format!("extra_{i}"),
                RiskTier::Low,
                format!(r#"openat\(.*"/opt/app{i}/.*""#),
                format!("extra rule {i}"),
            )
        });
        let catalog = RuleCatalog::with_extra(specs.collect()).unwrap();
        let classifier = LineClassifier::new(Arc::new(catalog));

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(extra), &line, |b, line| {
            b.iter(|| classifier.classify(black_box(line)).len());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_classify,
    bench_first_high,
    bench_category,
    bench_catalog_scaling
);
criterion_main!(benches);
