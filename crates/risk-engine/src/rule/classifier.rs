//! 라인 분류기 -- 트레이스 라인 하나를 카탈로그 전체와 대조합니다.
//!
//! 분류는 순수 함수입니다. 같은 라인과 같은 카탈로그에 대해 항상 같은
//! 매칭 순서를 돌려주며, 에러 경로가 없습니다.

use std::sync::Arc;

use tracesentry_core::types::RiskTier;

use super::catalog::{CompiledRule, RuleCatalog};

/// 프로세스 실행 마커
const SPAWN_MARKER: &str = "execve(";

/// 파일 조작으로 집계되는 시스템 콜
const FILE_SYSCALLS: &[&str] = &[
    "open",
    "openat",
    "openat2",
    "creat",
    "unlink",
    "unlinkat",
    "rename",
    "renameat",
    "renameat2",
    "truncate",
    "ftruncate",
    "chmod",
    "fchmodat",
    "chown",
    "fchownat",
    "mkdir",
    "mkdirat",
    "rmdir",
    "link",
    "linkat",
    "symlink",
    "symlinkat",
    "readlink",
    "readlinkat",
    "access",
    "faccessat",
    "faccessat2",
    "stat",
    "lstat",
    "newfstatat",
    "statx",
    "mount",
    "umount2",
];

/// 네트워크 조작으로 집계되는 시스템 콜
const NET_SYSCALLS: &[&str] = &[
    "socket",
    "connect",
    "bind",
    "listen",
    "accept",
    "accept4",
    "sendto",
    "recvfrom",
    "sendmsg",
    "recvmsg",
    "sendmmsg",
    "recvmmsg",
    "getsockopt",
    "setsockopt",
    "shutdown",
    "socketpair",
];

/// 규칙 매칭 결과
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    /// 매칭된 규칙의 등급
    pub tier: RiskTier,
    /// 매칭된 규칙
    pub rule: &'a CompiledRule,
}

impl RuleMatch<'_> {
    /// 규칙 ID
    pub fn rule_id(&self) -> &str {
        self.rule.id()
    }

    /// 보고 메시지
    pub fn message(&self) -> &str {
        self.rule.message()
    }
}

/// 카운터 집계용 라인 카테고리
///
/// 규칙 매칭 여부와 무관하게 라인 내용만으로 결정됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCategory {
    /// 프로세스 실행 (`execve(` 포함)
    pub spawn: bool,
    /// 파일 조작 시스템 콜
    pub file_op: bool,
    /// 네트워크 시스템 콜
    pub net_op: bool,
}

impl LineCategory {
    /// 라인의 카테고리를 판정합니다.
    pub fn of(line: &str) -> Self {
        let syscall = leading_syscall(line);
        Self {
            spawn: line.contains(SPAWN_MARKER),
            file_op: syscall.is_some_and(|name| FILE_SYSCALLS.contains(&name)),
            net_op: syscall.is_some_and(|name| NET_SYSCALLS.contains(&name)),
        }
    }
}

/// 라인 앞의 시스템 콜 이름을 추출합니다.
///
/// `[pid N] ` 또는 `N ` 접두사는 건너뜁니다. 이름 바로 뒤에 `(`가 없으면 `None`.
fn leading_syscall(line: &str) -> Option<&str> {
    let mut rest = line.trim_start();

    if let Some(after) = rest.strip_prefix("[pid") {
        let close = after.find(']')?;
        rest = after[close + 1..].trim_start();
    } else {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && rest[digits..].starts_with(char::is_whitespace) {
            rest = rest[digits..].trim_start();
        }
    }

    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if name_len == 0 || !rest[name_len..].starts_with('(') {
        return None;
    }
    Some(&rest[..name_len])
}

/// 라인 분류기
///
/// 공유 카탈로그를 참조하며 내부 상태를 갖지 않습니다.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    catalog: Arc<RuleCatalog>,
}

impl LineClassifier {
    /// 카탈로그로 분류기를 생성합니다.
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    /// 사용 중인 카탈로그
    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// 라인에 매칭되는 규칙을 `High -> Medium -> Low`, 카탈로그 순서대로 지연 평가합니다.
    ///
    /// 중단 정책이 첫 고위험 매칭에서 멈출 수 있도록 반복자로 제공합니다.
    pub fn matches<'a>(&'a self, line: &'a str) -> impl Iterator<Item = RuleMatch<'a>> + 'a {
        self.catalog
            .iter()
            .filter(move |rule| rule.is_match(line))
            .map(|rule| RuleMatch {
                tier: rule.tier(),
                rule,
            })
    }

    /// 라인에 매칭되는 모든 규칙을 반환합니다.
    pub fn classify<'a>(&'a self, line: &'a str) -> Vec<RuleMatch<'a>> {
        self.matches(line).collect()
    }
}
