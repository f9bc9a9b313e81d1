//! # tracesentry-core
//!
//! TraceSentry 공통 크레이트 -- 모든 크레이트가 공유하는 타입, 에러, 설정, 메트릭 이름을 제공합니다.
//!
//! - [`config`]: `tracesentry.toml` 로딩, 환경변수 오버라이드, 검증
//! - [`error`]: 도메인별 에러 계층
//! - [`types`]: 위험 등급과 심각도
//! - [`metrics`]: 메트릭 이름 상수와 설명 등록

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, DetectionError, SourceError, TraceSentryError};

// 설정
pub use config::{GeneralConfig, MonitorConfig, TraceSentryConfig, TracerConfig};

// 도메인 타입
pub use types::{RiskTier, Severity};
