//! 위험 보고서 -- 등급별 탐지 항목 누적과 텍스트 렌더링
//!
//! [`RiskReport`]는 실행 중 추가만 가능하며 중복을 제거하지 않습니다.
//! 각 항목은 `"<message>: <line>"` 형식입니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracesentry_core::types::RiskTier;

/// 위험 보고서
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReport {
    /// 높은 위험 항목
    pub high: Vec<String>,
    /// 중간 위험 항목
    pub medium: Vec<String>,
    /// 낮은 위험 항목
    pub low: Vec<String>,
}

impl RiskReport {
    /// 빈 보고서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙 매칭 항목을 추가합니다.
    pub fn record(&mut self, tier: RiskTier, message: &str, line: &str) {
        self.push(tier, format!("{message}: {line}"));
    }

    /// 이미 구성된 항목을 추가합니다.
    pub fn push(&mut self, tier: RiskTier, entry: String) {
        match tier {
            RiskTier::High => self.high.push(entry),
            RiskTier::Medium => self.medium.push(entry),
            RiskTier::Low => self.low.push(entry),
        }
    }

    /// 등급의 항목 목록
    pub fn entries(&self, tier: RiskTier) -> &[String] {
        match tier {
            RiskTier::High => &self.high,
            RiskTier::Medium => &self.medium,
            RiskTier::Low => &self.low,
        }
    }

    /// 전체 항목 수
    pub fn total(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    /// 항목이 하나도 없으면 true
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// 운영자용 텍스트로 렌더링합니다.
    pub fn format(&self) -> String {
        self.to_string()
    }
}

/// 등급 순서(`High -> Medium -> Low`)로 출력하며, 빈 등급은 `None`으로 표시합니다.
impl fmt::Display for RiskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tier in RiskTier::ALL {
            writeln!(f, "=== {tier} Risk ===")?;
            let entries = self.entries(tier);
            if entries.is_empty() {
                writeln!(f, "None")?;
            } else {
                for entry in entries {
                    writeln!(f, "{entry}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_prints_none_per_tier() {
        let text = RiskReport::new().format();
        assert_eq!(
            text,
            "=== High Risk ===\nNone\n=== Medium Risk ===\nNone\n=== Low Risk ===\nNone\n"
        );
    }

    #[test]
    fn entries_are_message_colon_line() {
        let mut report = RiskReport::new();
        report.record(RiskTier::Medium, "Mount operation", "mount(\"none\") = 0");
        assert_eq!(report.medium, vec!["Mount operation: mount(\"none\") = 0"]);
    }

    #[test]
    fn repeated_matches_are_not_deduplicated() {
        let mut report = RiskReport::new();
        report.record(RiskTier::Low, "Detected print() output", "write(1, \"a\", 1) = 1");
        report.record(RiskTier::Low, "Detected print() output", "write(1, \"a\", 1) = 1");
        assert_eq!(report.low.len(), 2);
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn format_keeps_tier_order_and_entry_order() {
        let mut report = RiskReport::new();
        report.push(RiskTier::Low, "l1".to_owned());
        report.push(RiskTier::High, "h1".to_owned());
        report.push(RiskTier::High, "h2".to_owned());
        let text = report.format();
        assert_eq!(
            text,
            "=== High Risk ===\nh1\nh2\n=== Medium Risk ===\nNone\n=== Low Risk ===\nl1\n"
        );
    }

    #[test]
    fn report_serializes_to_json_tiers() {
        let mut report = RiskReport::new();
        report.push(RiskTier::High, "x".to_owned());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["high"][0], "x");
        assert!(json["low"].as_array().unwrap().is_empty());
    }
}
