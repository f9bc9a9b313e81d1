//! 인터프리터 감사 훅 -- 모니터 자신의 민감 동작 관측
//!
//! 프로세스 전역에 한 번 설치되는 관측자입니다. 모니터가 트레이서를 실행하거나
//! 로그 파일을 여는 지점에서 [`emit`]으로 이벤트를 올리면, 훅이 이벤트 이름과
//! 인자를 감사 규칙 및 위험 심볼 테이블과 대조합니다.
//!
//! 트레이스 분류 엔진과 상태를 공유하지 않으며, 종료 로직도 없습니다.
//! 다른 소유자가 훅을 다시 설치하려 하면 [`EngineError::AuditTampering`]으로 거부합니다.

use std::sync::{Arc, Mutex, PoisonError};

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracesentry_core::metrics as m;
use tracesentry_core::types::Severity;

use crate::error::EngineError;

/// 감사 규칙 정의: (이벤트 패턴, 인자 패턴, 심각도, 설명)
const AUDIT_RULES: &[(&str, &str, Severity, &str)] = &[
    (
        r"^(exec|eval|compile|__import__)$",
        r".*",
        Severity::Critical,
        "Dynamic code execution detected",
    ),
    (
        r"^(os\.system|subprocess\.Popen)$",
        r".*",
        Severity::Critical,
        "Subprocess execution detected",
    ),
    (
        r"^(open|os\.open)$",
        r"path=.*?(/etc/(passwd|shadow|sudoers)|/root/|\.ssh/)",
        Severity::Critical,
        "Sensitive file access detected",
    ),
    (
        r"^(socket\.connect|socket\.create_connection)$",
        r".*",
        Severity::Critical,
        "Network connection operation detected",
    ),
];

/// 위험 심볼 대상 멤버
#[derive(Debug, Clone, Copy)]
enum Members {
    /// 모듈의 모든 멤버
    Any,
    /// 지정된 멤버만
    Only(&'static [&'static str]),
}

/// 위험 심볼 테이블: (심각도, 모듈, 멤버)
const UNSAFE_SYMBOLS: &[(Severity, &str, Members)] = &[
    (
        Severity::Critical,
        "builtins",
        Members::Only(&["exec", "eval", "compile", "__import__", "open", "breakpoint"]),
    ),
    (Severity::Critical, "os", Members::Any),
    (Severity::Critical, "socket", Members::Any),
    (Severity::Critical, "subprocess", Members::Any),
    (Severity::Critical, "pickle", Members::Any),
    (Severity::High, "webbrowser", Members::Any),
    (Severity::High, "requests.api", Members::Any),
];

/// 감사 발견 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditFinding {
    /// 이벤트 이름
    pub event: String,
    /// `", "`로 이어 붙인 인자
    pub args: String,
    /// 심각도
    pub severity: Severity,
    /// 설명
    pub description: String,
}

struct AuditRule {
    event: Regex,
    args: Regex,
    severity: Severity,
    description: &'static str,
}

/// 프로세스 전역 감사 훅
pub struct AuditHook {
    owner: String,
    rules: Vec<AuditRule>,
    findings: Mutex<Vec<AuditFinding>>,
}

static HOOK: Mutex<Option<Arc<AuditHook>>> = Mutex::new(None);

impl AuditHook {
    /// 감사 훅을 설치합니다.
    ///
    /// 같은 소유자의 재설치는 기존 훅을 그대로 반환합니다.
    ///
    /// # Errors
    /// 다른 소유자가 이미 설치한 경우 `AuditTampering`.
    pub fn install(owner: &str) -> Result<Arc<AuditHook>, EngineError> {
        let mut slot = HOOK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slot.as_ref() {
            if existing.owner == owner {
                return Ok(Arc::clone(existing));
            }
            tracing::error!(
                owner = %existing.owner,
                attempted_by = owner,
                "Unauthorized audit hook modification detected"
            );
            return Err(EngineError::AuditTampering {
                owner: existing.owner.clone(),
                attempted_by: owner.to_owned(),
            });
        }

        let hook = Arc::new(Self::new(owner)?);
        *slot = Some(Arc::clone(&hook));
        tracing::info!(owner, "audit hook installed");
        Ok(hook)
    }

    /// 감사 훅을 제거합니다. 설치한 소유자만 제거할 수 있습니다.
    pub fn uninstall(owner: &str) -> Result<(), EngineError> {
        let mut slot = HOOK.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(existing) if existing.owner != owner => {
                tracing::error!(
                    owner = %existing.owner,
                    attempted_by = owner,
                    "Unauthorized audit hook modification detected"
                );
                Err(EngineError::AuditTampering {
                    owner: existing.owner.clone(),
                    attempted_by: owner.to_owned(),
                })
            }
            _ => {
                *slot = None;
                Ok(())
            }
        }
    }

    /// 현재 설치된 훅
    pub fn current() -> Option<Arc<AuditHook>> {
        HOOK.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    fn new(owner: &str) -> Result<Self, EngineError> {
        let rules = AUDIT_RULES
            .iter()
            .map(|(event, args, severity, description)| -> Result<AuditRule, EngineError> {
                Ok(AuditRule {
                    event: Regex::new(event)?,
                    args: RegexBuilder::new(args).case_insensitive(true).build()?,
                    severity: *severity,
                    description: *description,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Self {
            owner: owner.to_owned(),
            rules,
            findings: Mutex::new(Vec::new()),
        })
    }

    /// 훅 소유자
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// 이벤트를 검사하여 발견 항목을 반환합니다. 상태를 바꾸지 않습니다.
    pub fn inspect(&self, event: &str, args: &[&str]) -> Vec<AuditFinding> {
        let joined = args.join(", ");
        let mut findings = Vec::new();

        for rule in &self.rules {
            if rule.event.is_match(event) && rule.args.is_match(&joined) {
                findings.push(AuditFinding {
                    event: event.to_owned(),
                    args: joined.clone(),
                    severity: rule.severity,
                    description: rule.description.to_owned(),
                });
            }
        }

        for (severity, module, members) in UNSAFE_SYMBOLS {
            if !event.contains(module) {
                continue;
            }
            let hit = match members {
                Members::Any => true,
                Members::Only(names) => names.iter().any(|name| event.contains(name)),
            };
            if hit {
                findings.push(AuditFinding {
                    event: event.to_owned(),
                    args: joined.clone(),
                    severity: *severity,
                    description: format!("Unsafe global usage detected: module '{module}'"),
                });
            }
        }

        findings
    }

    /// 지금까지 기록된 발견 항목
    pub fn findings(&self) -> Vec<AuditFinding> {
        self.findings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, event: &str, args: &[&str]) {
        let found = self.inspect(event, args);
        if found.is_empty() {
            return;
        }
        for finding in &found {
            tracing::warn!(
                severity = %finding.severity,
                event = %finding.event,
                args = %finding.args,
                "[AUDIT] {}",
                finding.description
            );
            let severity = finding.severity.to_string().to_lowercase();
            metrics::counter!(m::AUDIT_FINDINGS_TOTAL, m::LABEL_SEVERITY => severity).increment(1);
        }
        self.findings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(found);
    }
}

/// 감사 이벤트를 올립니다. 훅이 설치되지 않았으면 아무 일도 하지 않습니다.
pub fn emit(event: &str, args: &[&str]) {
    if let Some(hook) = AuditHook::current() {
        hook.record(event, args);
    }
}
