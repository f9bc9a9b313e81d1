//! 분류 파이프라인 -- 배치 모드와 스트리밍 모드
//!
//! 두 모드는 같은 라인 처리 규칙([`RunState`])을 공유하며, 같은 [`RunResult`]를 반환합니다.
//!
//! # 처리 흐름
//! ```text
//! raw line -> trim -> LineClassifier -> RiskReport (append)
//!                                    -> RunCounters (spawn/file/net)
//!                                    -> PolicyAbort / CapExceeded 판정
//! ```
//!
//! - [`batch`]: 완료된 로그 파일을 접두사로 찾아 순서대로 분류
//! - [`stream`]: 실행 중인 트레이서 출력을 한 줄씩 분류하고 필요하면 종료

pub mod batch;
pub mod stream;

pub use batch::{BatchPipeline, discover_logs};
pub use stream::{ChildProcess, StreamPipeline, TracedProcess};

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracesentry_core::metrics as m;
use tracesentry_core::types::RiskTier;
use uuid::Uuid;

use crate::counters::{CapStatus, RunCounters};
use crate::policy::TerminationPolicy;
use crate::report::RiskReport;
use crate::rule::LineClassifier;

/// 실행 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// 완료된 로그 분석
    Batch,
    /// 실시간 스트림 분석
    Stream,
}

impl RunMode {
    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Stream => "stream",
        }
    }
}

/// 실행 종료 사유
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 입력 끝까지 정상 처리
    Completed,
    /// 중단 정책에 의한 고위험 중단
    PolicyAbort {
        /// 트리거 규칙 ID
        rule_id: String,
        /// 트리거 규칙 메시지
        message: String,
        /// 트리거 라인
        line: String,
    },
    /// 서브프로세스 생성 상한 초과
    CapExceeded {
        /// 관측된 생성 수
        spawns: u64,
        /// 적용된 상한
        cap: u64,
        /// 종료 신호를 받은 추적 대상 PID (배치 모드에서는 없음)
        terminated_pid: Option<u32>,
    },
}

impl RunOutcome {
    /// 정상 완료 여부
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// 메트릭 레이블 값
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PolicyAbort { .. } => "policy_abort",
            Self::CapExceeded { .. } => "cap_exceeded",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::PolicyAbort { rule_id, message, .. } => {
                write!(f, "aborted on high risk: {message} ({rule_id})")
            }
            Self::CapExceeded {
                spawns,
                cap,
                terminated_pid,
            } => {
                write!(f, "subprocess cap exceeded: {spawns} > {cap}")?;
                if let Some(pid) = terminated_pid {
                    write!(f, ", terminated pid {pid}")?;
                }
                Ok(())
            }
        }
    }
}

/// 한 번의 모니터링 실행 결과
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// 실행 ID
    pub run_id: Uuid,
    /// 실행 모드
    pub mode: RunMode,
    /// 시작 시각
    pub started_at: DateTime<Utc>,
    /// 종료 시각
    pub finished_at: DateTime<Utc>,
    /// 종료 사유
    pub outcome: RunOutcome,
    /// 누적된 위험 보고서
    pub report: RiskReport,
    /// 실행 카운터
    pub counters: RunCounters,
    /// 처리한 라인 수
    pub lines: u64,
}

/// 한 라인 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineVerdict {
    /// 계속 진행
    Continue,
    /// 중단 정책 발동
    Abort {
        rule_id: String,
        message: String,
        line: String,
    },
    /// 생성 상한 초과 (이번 라인에서 처음 넘었거나 이미 넘은 상태)
    CapExceeded,
}

/// 실행 단위 상태 -- 보고서와 카운터를 단독 소유합니다.
pub(crate) struct RunState<'c> {
    run_id: Uuid,
    mode: RunMode,
    started_at: DateTime<Utc>,
    classifier: &'c LineClassifier,
    policy: TerminationPolicy,
    report: RiskReport,
    counters: RunCounters,
    /// 임계값 규칙의 실행 내 매칭 횟수
    rule_hits: HashMap<String, u64>,
    lines: u64,
}

impl<'c> RunState<'c> {
    pub(crate) fn new(mode: RunMode, classifier: &'c LineClassifier, policy: TerminationPolicy) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            started_at: Utc::now(),
            classifier,
            policy,
            report: RiskReport::new(),
            counters: RunCounters::new(),
            rule_hits: HashMap::new(),
            lines: 0,
        }
    }

    pub(crate) fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub(crate) fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub(crate) fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    pub(crate) fn report_mut(&mut self) -> &mut RiskReport {
        &mut self.report
    }

    /// 정규화된 라인 하나를 처리합니다.
    ///
    /// 중단 정책이 켜져 있으면 첫 고위험 매칭을 기록한 직후 멈추며,
    /// 이 경우 해당 라인의 나머지 매칭과 카운터 갱신은 수행하지 않습니다.
    pub(crate) fn process_line(&mut self, line: &str) -> LineVerdict {
        self.lines += 1;
        metrics::counter!(m::LINES_CLASSIFIED_TOTAL).increment(1);

        let classifier = self.classifier;
        for matched in classifier.matches(line) {
            if let Some(threshold) = matched.rule.threshold() {
                let hits = self
                    .rule_hits
                    .entry(matched.rule_id().to_owned())
                    .or_insert(0);
                *hits += 1;
                if *hits < threshold {
                    continue;
                }
            }

            self.report.record(matched.tier, matched.message(), line);
            metrics::counter!(m::RULE_MATCHES_TOTAL, m::LABEL_TIER => matched.tier.as_str())
                .increment(1);

            if matched.tier == RiskTier::High && self.policy.on_high_risk {
                return LineVerdict::Abort {
                    rule_id: matched.rule_id().to_owned(),
                    message: matched.message().to_owned(),
                    line: line.to_owned(),
                };
            }
        }

        match self.counters.observe(line, self.policy.subprocess_cap) {
            CapStatus::Ok => LineVerdict::Continue,
            CapStatus::Exceeded => LineVerdict::CapExceeded,
        }
    }

    /// 실행을 마치고 결과를 만듭니다.
    pub(crate) fn finish(self, outcome: RunOutcome) -> RunResult {
        let finished_at = Utc::now();
        let elapsed = (finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();

        metrics::counter!(
            m::RUNS_TOTAL,
            m::LABEL_MODE => self.mode.as_str(),
            m::LABEL_OUTCOME => outcome.as_label()
        )
        .increment(1);
        metrics::histogram!(m::RUN_DURATION_SECONDS).record(elapsed);
        match outcome {
            RunOutcome::Completed => {}
            RunOutcome::PolicyAbort { .. } => {
                metrics::counter!(m::POLICY_ABORTS_TOTAL).increment(1);
            }
            RunOutcome::CapExceeded { .. } => {
                metrics::counter!(m::CAP_EXCEEDED_TOTAL).increment(1);
            }
        }

        tracing::info!(
            outcome = outcome.as_label(),
            lines = self.lines,
            spawns = self.counters.subprocess_spawns,
            high = self.report.high.len(),
            medium = self.report.medium.len(),
            low = self.report.low.len(),
            "monitoring run finished"
        );

        RunResult {
            run_id: self.run_id,
            mode: self.mode,
            started_at: self.started_at,
            finished_at,
            outcome,
            report: self.report,
            counters: self.counters,
            lines: self.lines,
        }
    }
}

/// 원시 바이트 라인을 정규화합니다 (손실 허용 UTF-8 디코딩 + 앞뒤 공백 제거).
pub(crate) fn normalize_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_owned()
}
