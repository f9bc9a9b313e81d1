#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use tracesentry_engine::{LineCategory, LineClassifier, RuleCatalog, RunCounters};

fn classifier() -> &'static LineClassifier {
    static CLASSIFIER: OnceLock<LineClassifier> = OnceLock::new();
    CLASSIFIER.get_or_init(|| {
        let catalog = RuleCatalog::builtin().expect("builtin catalog compiles");
        LineClassifier::new(Arc::new(catalog))
    })
}

fuzz_target!(|data: &[u8]| {
    // 파이프라인과 같은 방식으로 정규화
    let decoded = String::from_utf8_lossy(data);
    let line = decoded.trim();

    let first: Vec<&str> = classifier().matches(line).map(|m| m.rule_id()).collect();
    let second: Vec<&str> = classifier().matches(line).map(|m| m.rule_id()).collect();
    assert_eq!(first, second, "classification must be deterministic");

    let category = LineCategory::of(line);
    let mut counters = RunCounters::new();
    counters.observe(line, 1);
    assert_eq!(counters.subprocess_spawns, u64::from(category.spawn));
});
