//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진과 CLI는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 모든 호출은 no-op 입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tracesentry_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(tracesentry_core::metrics::LINES_CLASSIFIED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 위험 등급 레이블 키 (high, medium, low)
pub const LABEL_TIER: &str = "tier";

/// 심각도 레이블 키 (low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 실행 모드 레이블 키 (batch, stream)
pub const LABEL_MODE: &str = "mode";

/// 실행 결과 레이블 키 (completed, policy_abort, cap_exceeded)
pub const LABEL_OUTCOME: &str = "outcome";

// ─── 분류 메트릭 ────────────────────────────────────────────────────

/// 분류된 트레이스 라인 수 (counter)
pub const LINES_CLASSIFIED_TOTAL: &str = "tracesentry_lines_classified_total";

/// 등급별 규칙 매칭 수 (counter, label: tier)
pub const RULE_MATCHES_TOTAL: &str = "tracesentry_rule_matches_total";

/// 관측된 서브프로세스 생성 수 (counter)
pub const SPAWNS_OBSERVED_TOTAL: &str = "tracesentry_spawns_observed_total";

/// 로드된 규칙 수 (gauge)
pub const RULES_LOADED: &str = "tracesentry_rules_loaded";

// ─── 실행 메트릭 ────────────────────────────────────────────────────

/// 결과별 모니터링 실행 수 (counter, labels: mode, outcome)
pub const RUNS_TOTAL: &str = "tracesentry_runs_total";

/// 고위험 탐지로 중단된 실행 수 (counter)
pub const POLICY_ABORTS_TOTAL: &str = "tracesentry_policy_aborts_total";

/// 서브프로세스 상한 초과 횟수 (counter)
pub const CAP_EXCEEDED_TOTAL: &str = "tracesentry_cap_exceeded_total";

/// 추적 대상 종료 횟수 (counter)
pub const TERMINATIONS_TOTAL: &str = "tracesentry_terminations_total";

/// 모니터링 실행 소요 시간 (histogram, 초)
pub const RUN_DURATION_SECONDS: &str = "tracesentry_run_duration_seconds";

// ─── 감사 메트릭 ────────────────────────────────────────────────────

/// 심각도별 감사 발견 수 (counter, label: severity)
pub const AUDIT_FINDINGS_TOTAL: &str = "tracesentry_audit_findings_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        LINES_CLASSIFIED_TOTAL,
        "Total number of trace lines classified"
    );
    describe_counter!(
        RULE_MATCHES_TOTAL,
        "Rule matches per risk tier (high, medium, low)"
    );
    describe_counter!(
        SPAWNS_OBSERVED_TOTAL,
        "Process-spawn events observed in traces"
    );
    describe_gauge!(RULES_LOADED, "Number of detection rules currently loaded");

    describe_counter!(RUNS_TOTAL, "Monitoring runs by mode and outcome");
    describe_counter!(
        POLICY_ABORTS_TOTAL,
        "Runs aborted by a high-risk match under the abort policy"
    );
    describe_counter!(
        CAP_EXCEEDED_TOTAL,
        "Runs where the subprocess spawn cap was exceeded"
    );
    describe_counter!(
        TERMINATIONS_TOTAL,
        "Traced processes terminated by a termination policy"
    );
    describe_histogram!(
        RUN_DURATION_SECONDS,
        "Wall-clock duration of a monitoring run in seconds"
    );

    describe_counter!(
        AUDIT_FINDINGS_TOTAL,
        "Interpreter audit findings per severity"
    );
}
