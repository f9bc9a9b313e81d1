//! 실행 카운터 -- 실행 단위의 카테고리 집계와 서브프로세스 상한 검사

use serde::Serialize;

use crate::rule::LineCategory;

/// 상한 검사 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapStatus {
    /// 상한 이내
    Ok,
    /// 서브프로세스 생성 수가 상한을 넘음
    Exceeded,
}

/// 실행 카운터
///
/// 실행마다 새로 생성되며, 해당 실행의 파이프라인만 소유합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// 관측된 프로세스 실행 수
    pub subprocess_spawns: u64,
    /// 파일 조작 시스템 콜 수
    pub file_ops: u64,
    /// 네트워크 시스템 콜 수
    pub net_ops: u64,
}

impl RunCounters {
    /// 모든 카운터가 0인 상태로 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 라인을 관측하고 상한 상태를 반환합니다.
    pub fn observe(&mut self, line: &str, cap: u64) -> CapStatus {
        self.observe_category(LineCategory::of(line), cap)
    }

    /// 미리 판정된 카테고리로 카운터를 갱신합니다.
    ///
    /// 매 라인마다 호출되며, 생성 수가 `cap`을 넘는 순간부터 `Exceeded`를 반환합니다.
    pub fn observe_category(&mut self, category: LineCategory, cap: u64) -> CapStatus {
        if category.spawn {
            self.subprocess_spawns += 1;
            metrics::counter!(tracesentry_core::metrics::SPAWNS_OBSERVED_TOTAL).increment(1);
        }
        if category.file_op {
            self.file_ops += 1;
        }
        if category.net_op {
            self.net_ops += 1;
        }
        self.cap_status(cap)
    }

    /// 현재 상한 상태
    pub fn cap_status(&self, cap: u64) -> CapStatus {
        if self.subprocess_spawns > cap {
            CapStatus::Exceeded
        } else {
            CapStatus::Ok
        }
    }
}
