//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 위험 등급([`RiskTier`])과 감사 이벤트 심각도([`Severity`])를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 위험 등급
///
/// 트레이스 라인 분류 규칙이 속하는 버킷입니다.
/// 보고서 출력 순서는 항상 `High -> Medium -> Low` 입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// 높은 위험 -- 중단 정책의 대상
    High,
    /// 중간 위험
    Medium,
    /// 낮은 위험 (일반 진단 출력)
    Low,
}

impl RiskTier {
    /// 보고서 출력 순서대로 정렬된 전체 등급
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    /// 소문자 이름을 반환합니다 (메트릭 레이블, 설정 값).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// 문자열에서 등급을 파싱합니다.
    ///
    /// 대소문자를 구분하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" | "med" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

/// 심각도 레벨
///
/// 인터프리터 감사 이벤트의 심각도를 나타냅니다.
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 낮은 심각도
    #[default]
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 -- 즉시 대응 필요
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_order_is_high_medium_low() {
        assert_eq!(
            RiskTier::ALL,
            [RiskTier::High, RiskTier::Medium, RiskTier::Low]
        );
    }

    #[test]
    fn tier_from_str_loose() {
        assert_eq!(RiskTier::from_str_loose("HIGH"), Some(RiskTier::High));
        assert_eq!(RiskTier::from_str_loose("med"), Some(RiskTier::Medium));
        assert_eq!(RiskTier::from_str_loose("low"), Some(RiskTier::Low));
        assert_eq!(RiskTier::from_str_loose("critical"), None);
    }

    #[test]
    fn tier_serializes_lowercase() {
        let json = serde_json::to_string(&RiskTier::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_display_is_uppercase() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }
}
