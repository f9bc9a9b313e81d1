//! 탐지 규칙 데이터 타입
//!
//! 내장 카탈로그와 YAML 규칙 파일이 공유하는 규칙 정의를 담습니다.

use serde::{Deserialize, Serialize};
use tracesentry_core::types::RiskTier;

use crate::error::EngineError;

/// 규칙 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 256;

/// 탐지 규칙 정의 -- 패턴과 메시지의 쌍
///
/// # YAML 스키마
/// 규칙 파일은 규칙 목록을 담습니다.
/// ```yaml
/// - id: shadow_copy
///   tier: high
///   pattern: 'openat\(.*"/var/backups/shadow\.bak"'
///   message: Reading a shadow backup
/// - id: curl_spawn
///   tier: medium
///   pattern: 'execve\("/usr/bin/curl"'
///   message: curl launched
///   threshold: 3
///   case_insensitive: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// 규칙 고유 ID (snake_case 권장)
    pub id: String,
    /// 위험 등급
    pub tier: RiskTier,
    /// 정규식 패턴 (라인 전체에 대한 부분 검색)
    pub pattern: String,
    /// 보고서에 기록되는 메시지
    pub message: String,
    /// 한 실행에서 이 횟수만큼 매칭된 이후부터 보고 (없으면 매번 보고)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
    /// 대소문자 무시 매칭
    #[serde(default)]
    pub case_insensitive: bool,
}

impl RuleSpec {
    /// 임계값 없이 대소문자를 구분하는 규칙을 생성합니다.
    pub fn new(
        id: impl Into<String>,
        tier: RiskTier,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tier,
            pattern: pattern.into(),
            message: message.into(),
            threshold: None,
            case_insensitive: false,
        }
    }

    /// 규칙의 유효성을 검증합니다.
    ///
    /// 정규식 컴파일 검증은 카탈로그 생성 시 수행됩니다.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.is_empty() {
            return Err(EngineError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        if self.pattern.is_empty() {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule pattern must not be empty".to_owned(),
            });
        }

        if self.message.is_empty() {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "rule message must not be empty".to_owned(),
            });
        }

        if self.threshold == Some(0) {
            return Err(EngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "threshold must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> RuleSpec {
        RuleSpec::new(
            "docker_socket",
            RiskTier::High,
            r#"openat\(.*"/var/run/docker\.sock""#,
            "Access to Docker daemon socket (container escape)",
        )
    }

    #[test]
    fn valid_rule_passes_validation() {
        sample_rule().validate().unwrap();
    }

    #[test]
    fn empty_id_fails_validation() {
        let mut rule = sample_rule();
        rule.id = String::new();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn too_long_id_fails_validation() {
        let mut rule = sample_rule();
        rule.id = "x".repeat(257);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn empty_message_fails_validation() {
        let mut rule = sample_rule();
        rule.message = String::new();
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("message"));
    }

    #[test]
    fn zero_threshold_fails() {
        let mut rule = sample_rule();
        rule.threshold = Some(0);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn rule_from_yaml_defaults_optional_fields() {
        let yaml = r#"
id: mount_call
tier: medium
pattern: 'mount\('
message: Mount operation
"#;
        let rule: RuleSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.tier, RiskTier::Medium);
        assert_eq!(rule.threshold, None);
        assert!(!rule.case_insensitive);
    }

    #[test]
    fn unknown_tier_is_rejected_by_yaml() {
        let yaml = "id: x\ntier: severe\npattern: a\nmessage: b\n";
        assert!(serde_yaml::from_str::<RuleSpec>(yaml).is_err());
    }
}
