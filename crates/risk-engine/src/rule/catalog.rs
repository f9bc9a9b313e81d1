//! 규칙 카탈로그 -- 등급별로 정렬된 불변 규칙 테이블
//!
//! [`RuleCatalog`]는 생성 시점에 모든 정규식을 컴파일하고, 이후에는
//! 읽기 전용으로만 사용됩니다. 잘못된 패턴은 생성 단계에서 실패합니다.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracesentry_core::types::RiskTier;

use super::types::RuleSpec;
use crate::error::EngineError;

/// 내장 규칙 테이블: (id, tier, pattern, message)
///
/// 등급 내 순서가 보고서 기록 순서를 결정합니다.
const BUILTIN_RULES: &[(&str, RiskTier, &str, &str)] = &[
    // --- High ---
    (
        "core_system_files",
        RiskTier::High,
        r#"openat\(.*"/etc/(passwd|shadow|sudoers|sudoers\.d/.*|group|hosts|ld\.so\.preload)""#,
        "Unauthorized access to core system configuration files",
    ),
    (
        "security_policy_files",
        RiskTier::High,
        r#"openat\(.*"/etc/(cron\..*|sysctl\.conf|security/access\.conf|apparmor/.*)""#,
        "Unauthorized access to system security policy files",
    ),
    (
        "user_credentials",
        RiskTier::High,
        r#"openat\(.*"/home/.*/(\.ssh/(id_rsa|authorized_keys|config)|\.aws/credentials|\.gnupg/.*)""#,
        "Access to user keys or cloud credentials",
    ),
    (
        "root_ssh",
        RiskTier::High,
        r#"openat\(.*"/root/\.ssh/.*""#,
        "Access to root user SSH files",
    ),
    (
        "kernel_memory",
        RiskTier::High,
        r#"openat\(.*"/(proc/kcore|sys/kernel/debug/.*|dev/(mem|kmem))""#,
        "Unauthorized access to kernel or physical memory",
    ),
    (
        "process_self_access",
        RiskTier::High,
        r#"openat\(.*"/proc/self/(mem|exe|fd/.*)""#,
        "Process memory or file descriptor operations",
    ),
    (
        "sensitive_write_open",
        RiskTier::High,
        r#"openat\(.*"(/etc/passwd|/etc/shadow|/var/spool/cron/.*)".*O_WRONLY"#,
        "Opening sensitive file in write mode",
    ),
    (
        "passwd_injection",
        RiskTier::High,
        r#"write\(\d+, ".*(root:/bin/bash|nobody:/bin/sh).*""#,
        "Detected unauthorized user addition (passwd format)",
    ),
    (
        "cron_injection",
        RiskTier::High,
        r#"write\(\d+, ".*\* \* \* \* \* .*""#,
        "Writing malicious cron job (crontab syntax)",
    ),
    (
        "log_removal",
        RiskTier::High,
        r#"(unlink|rename)\(.*"/var/log/(auth\.log|secure|btmp)""#,
        "Deleting or renaming system logs",
    ),
    (
        "log_truncation",
        RiskTier::High,
        r#"ftruncate\(\d+, 0\).*"/var/log/.*""#,
        "Clearing log file contents",
    ),
    (
        "network_access",
        RiskTier::High,
        r#"(connect\(.*sin_port=htons\(\d+\)|socket\(AF_INET, SOCK_STREAM, 0\)|sendto\(.*|recvfrom\(.*)"#,
        "Detected network access behavior",
    ),
    (
        "kernel_module",
        RiskTier::High,
        r#"(init_module|finit_module|delete_module)\("#,
        "Kernel module load/unload (Rootkit risk)",
    ),
    (
        "privileged_ptrace",
        RiskTier::High,
        r#"ptrace\(.*PID=\d+.*uid=0"#,
        "Tracing high-privilege processes (e.g., root)",
    ),
    (
        "process_memory_write",
        RiskTier::High,
        r#"write\(\d+, .*offset=0x[0-9a-f]+.*/proc/self/mem"#,
        "Process memory tampering (Shellcode injection)",
    ),
    (
        "docker_socket",
        RiskTier::High,
        r#"openat\(.*"/var/run/docker\.sock""#,
        "Access to Docker daemon socket (container escape)",
    ),
    (
        "namespace_probe",
        RiskTier::High,
        r#"openat\(.*"/proc/(mounts|self/ns/.*)""#,
        "Probing container/namespace environment",
    ),
    (
        "path_traversal",
        RiskTier::High,
        r#"openat\(.*"(\.\./)+etc/passwd""#,
        "Directory traversal attack attempt",
    ),
    (
        "tmp_executable_drop",
        RiskTier::High,
        r#"openat\(.*"/tmp/.*\.(so|sh|py|elf)".*O_CREAT"#,
        "Creating executable file in temporary directory",
    ),
    (
        "shell_spawn",
        RiskTier::High,
        r#"execve\("/bin/sh", \["sh", "-c", ".*"\]"#,
        "os.system() call detected",
    ),
    // --- Medium ---
    (
        "mount_call",
        RiskTier::Medium,
        r#"mount\("#,
        "Mount operation",
    ),
    (
        "web_server_config",
        RiskTier::Medium,
        r#"openat\(.*"/etc/nginx/nginx\.conf""#,
        "Reading web server configuration",
    ),
    (
        "dns_connect",
        RiskTier::Medium,
        r#"connect\(.*sin_port=htons\(53\)"#,
        "Using DNS protocol (possible covert communication)",
    ),
    // --- Low ---
    (
        "stdout_write",
        RiskTier::Low,
        r#"write\(1, .*"#,
        "Detected print() output",
    ),
];

/// 내장 규칙 정의 목록을 반환합니다.
pub fn builtin_specs() -> Vec<RuleSpec> {
    BUILTIN_RULES
        .iter()
        .map(|(id, tier, pattern, message)| RuleSpec::new(*id, *tier, *pattern, *message))
        .collect()
}

/// 정규식이 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    spec: RuleSpec,
    regex: Regex,
}

impl CompiledRule {
    /// 규칙을 검증하고 정규식을 컴파일합니다.
    pub fn compile(spec: RuleSpec) -> Result<Self, EngineError> {
        spec.validate()?;
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(spec.case_insensitive)
            .build()
            .map_err(|e| EngineError::RuleValidation {
                rule_id: spec.id.clone(),
                reason: format!("invalid regex: {e}"),
            })?;
        Ok(Self { spec, regex })
    }

    /// 규칙 ID
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// 위험 등급
    pub fn tier(&self) -> RiskTier {
        self.spec.tier
    }

    /// 보고 메시지
    pub fn message(&self) -> &str {
        &self.spec.message
    }

    /// 보고 임계값
    pub fn threshold(&self) -> Option<u64> {
        self.spec.threshold
    }

    /// 원본 규칙 정의
    pub fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    /// 라인 어디에서든 패턴이 발견되면 true
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }
}

/// 규칙 카탈로그 -- 등급별로 정렬된 불변 규칙 테이블
///
/// # 사용 예시
/// ```
/// use tracesentry_engine::rule::RuleCatalog;
/// use tracesentry_core::types::RiskTier;
///
/// let catalog = RuleCatalog::builtin().unwrap();
/// assert_eq!(catalog.rules(RiskTier::Medium).len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    /// `RiskTier::ALL` 순서의 등급별 규칙
    tiers: [Vec<CompiledRule>; 3],
}

impl RuleCatalog {
    /// 내장 규칙만으로 카탈로그를 생성합니다.
    pub fn builtin() -> Result<Self, EngineError> {
        Self::from_specs(builtin_specs())
    }

    /// 내장 규칙 뒤에 추가 규칙을 이어 붙여 카탈로그를 생성합니다.
    ///
    /// 추가 규칙은 같은 등급의 내장 규칙 뒤에 놓입니다.
    /// 이미 존재하는 ID를 가진 추가 규칙은 경고 후 건너뜁니다.
    pub fn with_extra(extra: Vec<RuleSpec>) -> Result<Self, EngineError> {
        let mut specs = builtin_specs();
        let mut seen: HashSet<String> = specs.iter().map(|s| s.id.clone()).collect();
        for spec in extra {
            if !seen.insert(spec.id.clone()) {
                tracing::warn!(rule_id = %spec.id, "duplicate rule id, skipping");
                continue;
            }
            specs.push(spec);
        }
        Self::from_specs(specs)
    }

    /// 규칙 정의 목록에서 카탈로그를 생성합니다.
    ///
    /// 등급 내 순서는 입력 순서를 따릅니다. 하나라도 잘못된 규칙이 있으면 실패합니다.
    pub fn from_specs(specs: impl IntoIterator<Item = RuleSpec>) -> Result<Self, EngineError> {
        let mut tiers: [Vec<CompiledRule>; 3] = [Vec::new(), Vec::new(), Vec::new()];
        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.id.clone()) {
                return Err(EngineError::RuleValidation {
                    rule_id: spec.id,
                    reason: "duplicate rule id".to_owned(),
                });
            }
            let rule = CompiledRule::compile(spec)?;
            tiers[tier_index(rule.tier())].push(rule);
        }

        let catalog = Self { tiers };
        metrics::gauge!(tracesentry_core::metrics::RULES_LOADED).set(catalog.len() as f64);
        Ok(catalog)
    }

    /// 등급의 규칙 목록을 카탈로그 순서대로 반환합니다.
    pub fn rules(&self, tier: RiskTier) -> &[CompiledRule] {
        &self.tiers[tier_index(tier)]
    }

    /// 모든 규칙을 `High -> Medium -> Low` 순서로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledRule> {
        self.tiers.iter().flatten()
    }

    /// ID로 규칙을 찾습니다.
    pub fn get(&self, rule_id: &str) -> Option<&CompiledRule> {
        self.iter().find(|r| r.id() == rule_id)
    }

    /// 전체 규칙 수
    pub fn len(&self) -> usize {
        self.tiers.iter().map(Vec::len).sum()
    }

    /// 규칙이 없으면 true
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn tier_index(tier: RiskTier) -> usize {
    match tier {
        RiskTier::High => 0,
        RiskTier::Medium => 1,
        RiskTier::Low => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_compiles() {
        let catalog = RuleCatalog::builtin().unwrap();
        assert_eq!(catalog.rules(RiskTier::High).len(), 20);
        assert_eq!(catalog.rules(RiskTier::Medium).len(), 3);
        assert_eq!(catalog.rules(RiskTier::Low).len(), 1);
        assert_eq!(catalog.len(), 24);
    }

    #[test]
    fn builtin_ids_are_unique() {
        let specs = builtin_specs();
        let ids: HashSet<_> = specs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), specs.len());
    }

    #[test]
    fn iteration_follows_tier_order() {
        let catalog = RuleCatalog::builtin().unwrap();
        let tiers: Vec<RiskTier> = catalog.iter().map(|r| r.tier()).collect();
        let first_medium = tiers.iter().position(|t| *t == RiskTier::Medium).unwrap();
        assert!(tiers[..first_medium].iter().all(|t| *t == RiskTier::High));
        assert_eq!(tiers.last(), Some(&RiskTier::Low));
    }

    #[test]
    fn invalid_regex_fails_at_construction() {
        let spec = RuleSpec::new("broken", RiskTier::High, "openat\\((", "broken rule");
        let err = RuleCatalog::from_specs(vec![spec]).unwrap_err();
        assert!(matches!(err, EngineError::RuleValidation { .. }));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn duplicate_ids_fail_in_from_specs() {
        let a = RuleSpec::new("dup", RiskTier::Low, "a", "first");
        let b = RuleSpec::new("dup", RiskTier::High, "b", "second");
        assert!(RuleCatalog::from_specs(vec![a, b]).is_err());
    }

    #[test]
    fn with_extra_appends_after_builtins_and_skips_duplicates() {
        let extra = vec![
            RuleSpec::new("curl_spawn", RiskTier::Medium, r#"execve\("/usr/bin/curl""#, "curl launched"),
            RuleSpec::new("dns_connect", RiskTier::Low, "x", "shadowing a builtin"),
        ];
        let catalog = RuleCatalog::with_extra(extra).unwrap();
        let medium = catalog.rules(RiskTier::Medium);
        assert_eq!(medium.len(), 4);
        assert_eq!(medium[3].id(), "curl_spawn");
        assert_eq!(catalog.get("dns_connect").unwrap().tier(), RiskTier::Medium);
    }

    #[test]
    fn case_insensitive_rule() {
        let mut spec = RuleSpec::new("nc", RiskTier::Medium, r#"execve\(".*/nc""#, "netcat");
        spec.case_insensitive = true;
        let rule = CompiledRule::compile(spec).unwrap();
        assert!(rule.is_match(r#"execve("/usr/bin/NC", ["nc"], 0x0) = 0"#));
    }

    #[test]
    fn patterns_are_case_sensitive_by_default() {
        let catalog = RuleCatalog::builtin().unwrap();
        let rule = catalog.get("root_ssh").unwrap();
        assert!(rule.is_match(r#"openat(AT_FDCWD, "/root/.ssh/id_rsa", O_RDONLY) = 3"#));
        assert!(!rule.is_match(r#"OPENAT(AT_FDCWD, "/root/.ssh/id_rsa", O_RDONLY) = 3"#));
    }
}
