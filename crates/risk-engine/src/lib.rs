//! # tracesentry-engine
//!
//! 시스템 콜 트레이스 라인을 위험 등급별로 분류하는 탐지 엔진입니다.
//!
//! # 모듈 구성
//!
//! - [`rule`]: 규칙 카탈로그, 라인 분류기, YAML 확장 규칙 로더
//! - [`counters`]: 실행 단위 카테고리 카운터와 서브프로세스 상한 검사
//! - [`report`]: 등급별 위험 보고서와 텍스트 렌더링
//! - [`policy`]: 종료 정책
//! - [`pipeline`]: 배치/스트리밍 분류 파이프라인
//! - [`tracer`]: 외부 트레이서 명령 구성 및 실행
//! - [`audit`]: 모니터 자신의 민감 동작을 관측하는 감사 훅
//! - [`monitor`]: 설정 기반 실행 오케스트레이션
//! - [`config`]: 엔진 실행 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! tracer output -> LineClassifier -> RiskReport
//!      |                |
//!  file / pipe     RunCounters -> PolicyAbort / CapExceeded -> terminate
//! ```

pub mod audit;
pub mod config;
pub mod counters;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod rule;
pub mod tracer;

// --- 주요 타입 re-export ---

// 오케스트레이션
pub use monitor::{Monitor, load_catalog};

// 설정
pub use config::{MonitorMode, MonitorSettings, MonitorSettingsBuilder};

// 에러
pub use error::EngineError;

// 파이프라인
pub use pipeline::{
    BatchPipeline, ChildProcess, RunMode, RunOutcome, RunResult, StreamPipeline, TracedProcess,
};

// 규칙
pub use rule::{LineCategory, LineClassifier, RuleCatalog, RuleMatch, RuleSpec};

// 상태와 보고서
pub use counters::{CapStatus, RunCounters};
pub use policy::TerminationPolicy;
pub use report::RiskReport;

// 감사
pub use audit::{AuditFinding, AuditHook};

// 트레이서
pub use tracer::TracerCommand;
