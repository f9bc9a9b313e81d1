//! 종료 정책

use serde::{Deserialize, Serialize};
use tracesentry_core::config::{DEFAULT_SUBPROCESS_CAP, MonitorConfig};

/// 실행 동안 고정되는 종료 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationPolicy {
    /// 첫 고위험 매칭에서 실행 중단
    pub on_high_risk: bool,
    /// 서브프로세스 생성 상한
    pub subprocess_cap: u64,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            on_high_risk: false,
            subprocess_cap: DEFAULT_SUBPROCESS_CAP,
        }
    }
}

impl TerminationPolicy {
    /// 모니터 설정에서 정책을 생성합니다.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            on_high_risk: config.terminate_on_high_risk,
            subprocess_cap: config.subprocess_cap,
        }
    }

    /// 고위험 중단 여부를 설정합니다.
    pub fn with_abort_on_high_risk(mut self, enabled: bool) -> Self {
        self.on_high_risk = enabled;
        self
    }

    /// 서브프로세스 상한을 설정합니다.
    pub fn with_subprocess_cap(mut self, cap: u64) -> Self {
        self.subprocess_cap = cap;
        self
    }
}
