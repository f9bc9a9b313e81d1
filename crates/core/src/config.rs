//! 설정 관리 -- tracesentry.toml 파싱 및 런타임 설정
//!
//! [`TraceSentryConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TRACESENTRY_MONITOR_SUBPROCESS_CAP=10` 형식)
//! 3. 설정 파일 (`tracesentry.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tracesentry_core::error::TraceSentryError> {
//! use tracesentry_core::config::TraceSentryConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TraceSentryConfig::load("tracesentry.toml").await?;
//!
//! // 파일이 없으면 기본값 사용
//! let config = TraceSentryConfig::load_or_default("tracesentry.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TraceSentryConfig::parse("[monitor]\nmode = \"realtime\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, TraceSentryError};

/// 기본 서브프로세스 생성 상한
pub const DEFAULT_SUBPROCESS_CAP: u64 = 50;

/// TraceSentry 통합 설정
///
/// `tracesentry.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceSentryConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 트레이서 실행 설정
    #[serde(default)]
    pub tracer: TracerConfig,
    /// 모니터링 실행 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl TraceSentryConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TraceSentryError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에서 시작하여 로드합니다.
    ///
    /// 파일이 존재하지만 읽을 수 없거나 파싱에 실패하면 에러를 반환합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, TraceSentryError> {
        let path = path.as_ref();
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(TraceSentryError::Config(ConfigError::FileNotFound { .. })) => {
                debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceSentryError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TraceSentryError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TraceSentryError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TraceSentryError> {
        toml::from_str(toml_str).map_err(|e| {
            TraceSentryError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TRACESENTRY_{SECTION}_{FIELD}`
    /// 예: `TRACESENTRY_MONITOR_MODE=realtime`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TRACESENTRY_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TRACESENTRY_GENERAL_LOG_FORMAT");

        // Tracer
        override_string(&mut self.tracer.program, "TRACESENTRY_TRACER_PROGRAM");
        override_csv(&mut self.tracer.categories, "TRACESENTRY_TRACER_CATEGORIES");
        override_usize(
            &mut self.tracer.string_limit,
            "TRACESENTRY_TRACER_STRING_LIMIT",
        );
        override_string(
            &mut self.tracer.interpreter,
            "TRACESENTRY_TRACER_INTERPRETER",
        );

        // Monitor
        override_string(&mut self.monitor.mode, "TRACESENTRY_MONITOR_MODE");
        override_string(&mut self.monitor.log_file, "TRACESENTRY_MONITOR_LOG_FILE");
        override_bool(
            &mut self.monitor.terminate_on_high_risk,
            "TRACESENTRY_MONITOR_TERMINATE_ON_HIGH_RISK",
        );
        override_u64(
            &mut self.monitor.subprocess_cap,
            "TRACESENTRY_MONITOR_SUBPROCESS_CAP",
        );
        override_string(&mut self.monitor.rule_dir, "TRACESENTRY_MONITOR_RULE_DIR");
        override_bool(&mut self.monitor.audit, "TRACESENTRY_MONITOR_AUDIT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TraceSentryError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.tracer.program.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tracer.program".to_owned(),
                reason: "tracer program must not be empty".to_owned(),
            }
            .into());
        }

        if self.tracer.categories.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tracer.categories".to_owned(),
                reason: "at least one trace category is required".to_owned(),
            }
            .into());
        }

        if self.tracer.string_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracer.string_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        let valid_modes = ["once", "realtime"];
        if !valid_modes.contains(&self.monitor.mode.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "monitor.mode".to_owned(),
                reason: format!("must be one of: {}", valid_modes.join(", ")),
            }
            .into());
        }

        // once 모드는 로그 파일 접두사로 결과를 다시 읽습니다
        if self.monitor.mode == "once" && self.monitor.log_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "monitor.log_file".to_owned(),
                reason: "log file is required in 'once' mode".to_owned(),
            }
            .into());
        }

        if self.monitor.subprocess_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "monitor.subprocess_cap".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 트레이서 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// 트레이서 실행 파일 (기본: strace)
    pub program: String,
    /// 추적할 시스템 콜 카테고리
    pub categories: Vec<String>,
    /// 문자열 인자 최대 출력 길이
    pub string_limit: usize,
    /// 대상 스크립트를 실행할 인터프리터 (빈 문자열이면 대상 직접 실행)
    pub interpreter: String,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            program: "strace".to_owned(),
            categories: vec![
                "file".to_owned(),
                "process".to_owned(),
                "network".to_owned(),
            ],
            string_limit: 1024,
            interpreter: "python".to_owned(),
        }
    }
}

/// 모니터링 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 실행 모드 (once, realtime)
    pub mode: String,
    /// 트레이스 로그 경로 (once: 출력 접두사, realtime: 기록 싱크)
    pub log_file: String,
    /// 고위험 탐지 시 즉시 중단
    pub terminate_on_high_risk: bool,
    /// 서브프로세스 생성 상한
    pub subprocess_cap: u64,
    /// 추가 YAML 규칙 디렉토리 (빈 문자열이면 내장 규칙만 사용)
    pub rule_dir: String,
    /// 인터프리터 감사 훅 활성화
    pub audit: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: "once".to_owned(),
            log_file: "trace.log".to_owned(),
            terminate_on_high_risk: false,
            subprocess_cap: DEFAULT_SUBPROCESS_CAP,
            rule_dir: String::new(),
            audit: false,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
