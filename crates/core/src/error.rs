//! 에러 타입 -- 도메인별 에러 정의

/// TraceSentry 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TraceSentryError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 입력 소스(트레이서, 로그 파일) 에러
    #[error("source unavailable: {0}")]
    Source(#[from] SourceError),

    /// 탐지 엔진 에러
    #[error("detection error: {0}")]
    Detection(#[from] DetectionError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 입력 소스 에러
///
/// 분류가 시작되기 전에 발생하며, 실행 전체가 실패합니다.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// 트레이서 프로세스 실행 실패
    #[error("failed to start tracer '{program}': {reason}")]
    TracerSpawn { program: String, reason: String },

    /// 로그 파일 열기 실패
    #[error("failed to open log '{path}': {reason}")]
    LogOpen { path: String, reason: String },

    /// 접두사에 해당하는 로그 파일 없음
    #[error("no trace logs match prefix '{prefix}'")]
    NoLogFiles { prefix: String },
}

/// 탐지 엔진 에러
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// 탐지 규칙 에러
    #[error("rule error: {0}")]
    Rule(String),

    /// 감사 훅 에러
    #[error("audit hook error: {0}")]
    Audit(String),

    /// 기록 싱크 에러
    #[error("sink error: {0}")]
    Sink(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_converts_into_top_level() {
        let err: TraceSentryError = SourceError::NoLogFiles {
            prefix: "/tmp/trace.log".to_owned(),
        }
        .into();
        assert!(matches!(err, TraceSentryError::Source(_)));
        assert!(err.to_string().contains("/tmp/trace.log"));
    }

    #[test]
    fn config_error_display_includes_field() {
        let err = ConfigError::InvalidValue {
            field: "monitor.mode".to_owned(),
            reason: "must be one of: once, realtime".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("monitor.mode"));
        assert!(msg.contains("realtime"));
    }

    #[test]
    fn tracer_spawn_display() {
        let err = SourceError::TracerSpawn {
            program: "strace".to_owned(),
            reason: "No such file or directory".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to start tracer 'strace': No such file or directory"
        );
    }
}
