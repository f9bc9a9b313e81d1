//! 탐지 엔진 에러 타입
//!
//! [`EngineError`]는 규칙 로딩, 입력 소스, 싱크, 감사 훅 등 엔진 내부에서
//! 발생하는 모든 에러를 표현합니다.
//! `From<EngineError> for TraceSentryError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 라인 단위 분류에는 에러 경로가 없습니다. 잘못된 규칙 패턴은
//! 카탈로그 생성 시점에 [`EngineError::RuleValidation`]으로 실패합니다.

use tracesentry_core::error::{DetectionError, SourceError, TraceSentryError};

/// 탐지 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 또는 디렉토리 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패 (잘못된 정규식 포함)
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 입력 소스를 사용할 수 없음 (트레이서 실행 실패, 로그 열기 실패)
    #[error(transparent)]
    SourceUnavailable(#[from] SourceError),

    /// 기록 싱크 에러
    #[error("sink error: {path}: {reason}")]
    Sink {
        /// 싱크 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 감사 훅 변조 시도
    #[error("Unauthorized audit hook modification detected (owner '{owner}', attempted by '{attempted_by}')")]
    AuditTampering {
        /// 현재 훅 소유자
        owner: String,
        /// 설치를 시도한 주체
        attempted_by: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<EngineError> for TraceSentryError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SourceUnavailable(source) => TraceSentryError::Source(source),
            EngineError::Io(io) => TraceSentryError::Io(io),
            EngineError::Config { field, reason } => TraceSentryError::Config(
                tracesentry_core::error::ConfigError::InvalidValue { field, reason },
            ),
            sink @ EngineError::Sink { .. } => {
                TraceSentryError::Detection(DetectionError::Sink(sink.to_string()))
            }
            tampering @ EngineError::AuditTampering { .. } => {
                TraceSentryError::Detection(DetectionError::Audit(tampering.to_string()))
            }
            other => TraceSentryError::Detection(DetectionError::Rule(other.to_string())),
        }
    }
}
