//! 모니터 실행 설정
//!
//! [`MonitorSettings`]는 core의 [`TraceSentryConfig`]를 기반으로
//! 엔진이 실제로 사용하는 타입 있는 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use tracesentry_core::config::TraceSentryConfig;
//! use tracesentry_engine::config::MonitorSettings;
//!
//! let core_config = TraceSentryConfig::default();
//! let settings = MonitorSettings::from_core(&core_config)?;
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracesentry_core::config::{TraceSentryConfig, TracerConfig};

use crate::error::EngineError;
use crate::policy::TerminationPolicy;

/// 실행 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// 트레이서 실행 완료 후 로그 분석 (기본값)
    #[default]
    Once,
    /// 트레이서 출력을 실시간으로 분석
    Realtime,
}

impl FromStr for MonitorMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(Self::Once),
            "realtime" => Ok(Self::Realtime),
            other => Err(EngineError::Config {
                field: "monitor.mode".to_owned(),
                reason: format!("unknown mode '{other}', expected 'once' or 'realtime'"),
            }),
        }
    }
}

impl fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::Realtime => write!(f, "realtime"),
        }
    }
}

/// 모니터 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// 실행 모드
    pub mode: MonitorMode,
    /// 트레이스 로그 경로 (once: 출력 접두사, realtime: 기록 싱크)
    pub log_file: Option<PathBuf>,
    /// 종료 정책
    pub policy: TerminationPolicy,
    /// 추가 YAML 규칙 디렉토리
    pub rule_dir: Option<PathBuf>,
    /// 감사 훅 활성화
    pub audit: bool,
    /// 트레이서 실행 설정
    pub tracer: TracerConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            mode: MonitorMode::Once,
            log_file: Some(PathBuf::from("trace.log")),
            policy: TerminationPolicy::default(),
            rule_dir: None,
            audit: false,
            tracer: TracerConfig::default(),
        }
    }
}

impl MonitorSettings {
    /// core 설정에서 모니터 설정을 생성합니다.
    pub fn from_core(core: &TraceSentryConfig) -> Result<Self, EngineError> {
        let monitor = &core.monitor;
        let settings = Self {
            mode: monitor.mode.parse()?,
            log_file: non_empty_path(&monitor.log_file),
            policy: TerminationPolicy::from_config(monitor),
            rule_dir: non_empty_path(&monitor.rule_dir),
            audit: monitor.audit,
            tracer: core.tracer.clone(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.policy.subprocess_cap == 0 {
            return Err(EngineError::Config {
                field: "monitor.subprocess_cap".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.mode == MonitorMode::Once && self.log_file.is_none() {
            return Err(EngineError::Config {
                field: "monitor.log_file".to_owned(),
                reason: "log file is required in 'once' mode".to_owned(),
            });
        }

        if self.tracer.program.is_empty() {
            return Err(EngineError::Config {
                field: "tracer.program".to_owned(),
                reason: "tracer program must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

/// 모니터 설정 빌더
///
/// CLI 인자로 설정 파일 값을 덮어쓸 때 사용합니다.
#[derive(Default)]
pub struct MonitorSettingsBuilder {
    settings: MonitorSettings,
}

impl MonitorSettingsBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 설정에서 시작합니다.
    pub fn from_settings(settings: MonitorSettings) -> Self {
        Self { settings }
    }

    /// 실행 모드를 설정합니다.
    pub fn mode(mut self, mode: MonitorMode) -> Self {
        self.settings.mode = mode;
        self
    }

    /// 트레이스 로그 경로를 설정합니다.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.log_file = Some(path.into());
        self
    }

    /// 고위험 탐지 시 중단 여부를 설정합니다.
    pub fn terminate_on_high_risk(mut self, enabled: bool) -> Self {
        self.settings.policy.on_high_risk = enabled;
        self
    }

    /// 서브프로세스 생성 상한을 설정합니다.
    pub fn subprocess_cap(mut self, cap: u64) -> Self {
        self.settings.policy.subprocess_cap = cap;
        self
    }

    /// 추가 규칙 디렉토리를 설정합니다.
    pub fn rule_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.rule_dir = Some(dir.into());
        self
    }

    /// 감사 훅 활성화 여부를 설정합니다.
    pub fn audit(mut self, enabled: bool) -> Self {
        self.settings.audit = enabled;
        self
    }

    /// 트레이서 설정을 지정합니다.
    pub fn tracer(mut self, tracer: TracerConfig) -> Self {
        self.settings.tracer = tracer;
        self
    }

    /// 설정을 검증하고 생성합니다.
    pub fn build(self) -> Result<MonitorSettings, EngineError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_core_defaults() {
        let settings = MonitorSettings::from_core(&TraceSentryConfig::default()).unwrap();
        assert_eq!(settings.mode, MonitorMode::Once);
        assert_eq!(settings.log_file, Some(PathBuf::from("trace.log")));
        assert_eq!(settings.rule_dir, None);
        assert_eq!(settings.policy.subprocess_cap, 50);
    }

    #[test]
    fn from_core_realtime_without_sink() {
        let mut core = TraceSentryConfig::default();
        core.monitor.mode = "realtime".to_owned();
        core.monitor.log_file = String::new();
        let settings = MonitorSettings::from_core(&core).unwrap();
        assert_eq!(settings.mode, MonitorMode::Realtime);
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn from_core_rejects_unknown_mode() {
        let mut core = TraceSentryConfig::default();
        core.monitor.mode = "batch".to_owned();
        let err = MonitorSettings::from_core(&core).unwrap_err();
        assert!(err.to_string().contains("monitor.mode"));
    }

    #[test]
    fn builder_overrides() {
        let settings = MonitorSettingsBuilder::new()
            .mode(MonitorMode::Realtime)
            .log_file("/tmp/t.log")
            .terminate_on_high_risk(true)
            .subprocess_cap(5)
            .rule_dir("rules")
            .audit(true)
            .build()
            .unwrap();
        assert!(settings.policy.on_high_risk);
        assert_eq!(settings.policy.subprocess_cap, 5);
        assert_eq!(settings.rule_dir, Some(PathBuf::from("rules")));
        assert!(settings.audit);
    }

    #[test]
    fn builder_rejects_zero_cap() {
        assert!(MonitorSettingsBuilder::new().subprocess_cap(0).build().is_err());
    }

    #[test]
    fn mode_parse_and_display() {
        assert_eq!("realtime".parse::<MonitorMode>().unwrap(), MonitorMode::Realtime);
        assert_eq!(MonitorMode::Once.to_string(), "once");
        assert!("Once".parse::<MonitorMode>().is_err());
    }
}
