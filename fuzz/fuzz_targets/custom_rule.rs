#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tracesentry_core::types::RiskTier;
use tracesentry_engine::{LineClassifier, RuleCatalog, RuleSpec};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    tier: FuzzTier,
    pattern: String,
    case_insensitive: bool,
    threshold: Option<u64>,
    line: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzTier {
    High,
    Medium,
    Low,
}

impl From<&FuzzTier> for RiskTier {
    fn from(tier: &FuzzTier) -> Self {
        match tier {
            FuzzTier::High => RiskTier::High,
            FuzzTier::Medium => RiskTier::Medium,
            FuzzTier::Low => RiskTier::Low,
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let mut spec = RuleSpec::new("fuzz_rule", (&input.tier).into(), input.pattern, "fuzz");
    spec.case_insensitive = input.case_insensitive;
    spec.threshold = input.threshold;

    // 잘못된 패턴은 카탈로그 생성 시점에 에러로 끝나야 함
    let Ok(catalog) = RuleCatalog::with_extra(vec![spec]) else {
        return;
    };
    let classifier = LineClassifier::new(Arc::new(catalog));
    let _ = classifier.classify(&input.line);
});
