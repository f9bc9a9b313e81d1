//! 통합 테스트 -- 트레이스 라인부터 위험 보고서까지의 전체 흐름 검증
//!
//! 배치(로그 파일)와 스트리밍(추적 대상 출력) 두 경로가 같은 보고서와
//! 종료 사유를 만드는지 공개 API만으로 확인합니다.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use tracesentry_core::types::RiskTier;
use tracesentry_engine::{
    BatchPipeline, EngineError, LineClassifier, RiskReport, RuleCatalog, RunOutcome,
    StreamPipeline, TerminationPolicy, TracedProcess,
};

const PASSWD_READ: &str = r#"openat(AT_FDCWD, "/etc/passwd", O_RDONLY) = 3"#;
const DNS_CONNECT: &str = "connect(3, {sa_family=AF_INET, sin_port=htons(53)}, 16) = 0";
const STDOUT_WRITE: &str = r#"write(1, "hello\n", 6) = 6"#;
const PLAIN_SPAWN: &str = r#"execve("/usr/bin/true", ["true"], 0x7ffc /* 12 vars */) = 0"#;
const CAP_MESSAGE: &str = "Too many subprocesses detected: 51, monitoring terminated";

fn catalog() -> Arc<RuleCatalog> {
    Arc::new(RuleCatalog::builtin().expect("builtin catalog"))
}

fn spawn_lines(count: usize) -> String {
    (0..count).map(|_| format!("{PLAIN_SPAWN}\n")).collect()
}

fn write_log(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).expect("write trace log");
}

/// 메모리 출력을 내보내는 가짜 추적 대상
struct ScriptedProcess {
    output: Option<Cursor<Vec<u8>>>,
    pid: u32,
    terminated: bool,
}

impl ScriptedProcess {
    fn new(content: impl Into<String>) -> Self {
        Self {
            output: Some(Cursor::new(content.into().into_bytes())),
            pid: 31337,
            terminated: false,
        }
    }
}

impl TracedProcess for ScriptedProcess {
    type Output = Cursor<Vec<u8>>;

    fn take_output(&mut self) -> Option<Self::Output> {
        self.output.take()
    }

    fn id(&self) -> Option<u32> {
        (!self.terminated).then_some(self.pid)
    }

    fn terminate(&mut self) -> Result<(), EngineError> {
        self.terminated = true;
        Ok(())
    }

    async fn wait(&mut self) -> Result<Option<i32>, EngineError> {
        Ok(if self.terminated { None } else { Some(0) })
    }
}

/// 핵심 설정 파일 읽기 -> 고위험
#[tokio::test]
async fn test_passwd_read_lands_in_high_tier() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "trace.log", &format!("{PASSWD_READ}\n"));

    let result = BatchPipeline::new(catalog(), TerminationPolicy::default())
        .run(dir.path().join("trace.log"))
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(
        result.report.entries(RiskTier::High),
        [format!(
            "Unauthorized access to core system configuration files: {PASSWD_READ}"
        )]
    );
    assert!(result.report.entries(RiskTier::Medium).is_empty());
}

/// DNS 포트 연결 -> 중위험
#[tokio::test]
async fn test_dns_connect_lands_in_medium_tier() {
    let result = StreamPipeline::new(catalog(), TerminationPolicy::default())
        .run(ScriptedProcess::new(format!("{DNS_CONNECT}\n")))
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(
        result.report.entries(RiskTier::Medium),
        [format!(
            "Using DNS protocol (possible covert communication): {DNS_CONNECT}"
        )]
    );
    assert_eq!(result.counters.net_ops, 1);
}

/// 배치 모드 상한 초과 -> 합성 고위험 항목
#[tokio::test]
async fn test_batch_cap_overflow_adds_synthetic_entry() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "trace.log", &spawn_lines(51));

    let result = BatchPipeline::new(catalog(), TerminationPolicy::default())
        .run(dir.path().join("trace.log"))
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        RunOutcome::CapExceeded {
            spawns: 51,
            cap: 50,
            terminated_pid: None,
        }
    );
    assert_eq!(result.report.entries(RiskTier::High), [CAP_MESSAGE.to_owned()]);
    assert!(result.report.format().contains(CAP_MESSAGE));
}

/// 상한과 같은 생성 수는 초과가 아님
#[tokio::test]
async fn test_batch_cap_boundary_is_strict() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "trace.log", &spawn_lines(50));

    let result = BatchPipeline::new(catalog(), TerminationPolicy::default())
        .run(dir.path().join("trace.log"))
        .await
        .unwrap();

    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(result.counters.subprocess_spawns, 50);
    assert!(result.report.is_empty());
}

/// 스트리밍 모드 상한 초과 -> 추적 대상 종료
#[tokio::test]
async fn test_stream_cap_overflow_terminates_process() {
    // 상한 초과 이후의 라인은 읽지 않습니다
    let content = format!("{}{PASSWD_READ}\n", spawn_lines(51));
    let result = StreamPipeline::new(catalog(), TerminationPolicy::default())
        .run(ScriptedProcess::new(content))
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        RunOutcome::CapExceeded {
            spawns: 51,
            cap: 50,
            terminated_pid: Some(31337),
        }
    );
    assert_eq!(result.lines, 51);
    assert!(result.report.entries(RiskTier::High).is_empty());
}

/// 중단 정책: 첫 고위험 매칭에서 멈추고 이후 라인은 보지 않음
#[tokio::test]
async fn test_abort_policy_stops_at_first_high_risk() {
    let dir = tempfile::tempdir().unwrap();
    write_log(
        dir.path(),
        "trace.log",
        &format!("{STDOUT_WRITE}\n{PASSWD_READ}\n{DNS_CONNECT}\n"),
    );

    let policy = TerminationPolicy::default().with_abort_on_high_risk(true);
    let result = BatchPipeline::new(catalog(), policy)
        .run(dir.path().join("trace.log"))
        .await
        .unwrap();

    match &result.outcome {
        RunOutcome::PolicyAbort { rule_id, line, .. } => {
            assert_eq!(rule_id, "core_system_files");
            assert_eq!(line, PASSWD_READ);
        }
        other => panic!("expected policy abort, got {other:?}"),
    }
    assert_eq!(result.lines, 2);
    assert!(result.report.entries(RiskTier::Medium).is_empty());
    assert_eq!(result.report.entries(RiskTier::Low).len(), 1);
    assert!(!result.outcome.is_success());
}

/// 같은 중단 정책이 스트리밍에서도 추적 대상을 종료
#[tokio::test]
async fn test_abort_policy_in_stream_terminates() {
    let policy = TerminationPolicy::default().with_abort_on_high_risk(true);
    let result = StreamPipeline::new(catalog(), policy)
        .run(ScriptedProcess::new(format!("{PASSWD_READ}\n{STDOUT_WRITE}\n")))
        .await
        .unwrap();

    assert!(matches!(result.outcome, RunOutcome::PolicyAbort { .. }));
    assert_eq!(result.lines, 1);
    assert!(result.report.entries(RiskTier::Low).is_empty());
}

/// 여러 파일이 접두사 순서대로 하나의 보고서로 합쳐짐
#[tokio::test]
async fn test_multi_file_prefix_merges_into_one_report() {
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "trace.log.200", &format!("{DNS_CONNECT}\n"));
    write_log(dir.path(), "trace.log.100", &format!("{PASSWD_READ}\n"));
    write_log(dir.path(), "unrelated.log", &format!("{STDOUT_WRITE}\n"));

    let result = BatchPipeline::new(catalog(), TerminationPolicy::default())
        .run(dir.path().join("trace.log"))
        .await
        .unwrap();

    let high = result.report.entries(RiskTier::High);
    assert_eq!(high.len(), 2);
    assert!(high[0].starts_with("Unauthorized access to core system configuration files"));
    assert!(high[1].starts_with("Detected network access behavior"));
    assert_eq!(result.report.entries(RiskTier::Medium).len(), 1);
    assert!(result.report.entries(RiskTier::Low).is_empty());
    assert_eq!(result.lines, 2);
}

/// 접두사와 일치하는 로그가 없으면 소스 에러
#[tokio::test]
async fn test_missing_logs_is_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BatchPipeline::new(catalog(), TerminationPolicy::default())
        .run(dir.path().join("trace.log"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SourceUnavailable(_)));
}

/// 같은 입력은 같은 보고서를 생성
#[tokio::test]
async fn test_same_input_same_report() {
    let dir = tempfile::tempdir().unwrap();
    write_log(
        dir.path(),
        "trace.log",
        &format!("{PASSWD_READ}\n{DNS_CONNECT}\n{STDOUT_WRITE}\nbrk(NULL) = 0x0\n"),
    );
    let pipeline = BatchPipeline::new(catalog(), TerminationPolicy::default());

    let first = pipeline.run(dir.path().join("trace.log")).await.unwrap();
    let second = pipeline.run(dir.path().join("trace.log")).await.unwrap();

    assert_eq!(first.report, second.report);
    assert_ne!(first.run_id, second.run_id);
}

/// 배치와 스트리밍이 같은 입력에 같은 보고서를 생성
#[tokio::test]
async fn test_batch_and_stream_agree() {
    let content = format!("{PASSWD_READ}\n{DNS_CONNECT}\n{STDOUT_WRITE}\n");
    let dir = tempfile::tempdir().unwrap();
    write_log(dir.path(), "trace.log", &content);

    let batch = BatchPipeline::new(catalog(), TerminationPolicy::default())
        .run(dir.path().join("trace.log"))
        .await
        .unwrap();
    let stream = StreamPipeline::new(catalog(), TerminationPolicy::default())
        .run(ScriptedProcess::new(content))
        .await
        .unwrap();

    assert_eq!(batch.report, stream.report);
    assert_eq!(batch.counters, stream.counters);
}

/// 모든 항목은 정확히 한 등급에만 속함
#[test]
fn test_tier_partition_per_rule() {
    let classifier = LineClassifier::new(catalog());
    let mut report = RiskReport::new();
    for line in [PASSWD_READ, DNS_CONNECT, STDOUT_WRITE] {
        for m in classifier.matches(line) {
            report.record(m.tier, m.message(), line);
        }
    }

    let total: usize = RiskTier::ALL
        .iter()
        .map(|tier| report.entries(*tier).len())
        .sum();
    assert_eq!(total, report.total());
    assert_eq!(report.total(), 4);
}

/// 스트리밍 싱크에 관측한 모든 라인이 기록됨
#[tokio::test]
async fn test_stream_sink_receives_observed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let sink = dir.path().join("live.log");

    let result = StreamPipeline::new(catalog(), TerminationPolicy::default())
        .with_sink(&sink)
        .run(ScriptedProcess::new(format!("{STDOUT_WRITE}\n\n{DNS_CONNECT}\n")))
        .await
        .unwrap();

    assert!(result.outcome.is_success());
    let written = std::fs::read_to_string(&sink).unwrap();
    assert!(written.contains(STDOUT_WRITE));
    assert!(written.contains(DNS_CONNECT));
}

/// 추가 규칙의 임계값: N번째 매칭부터 기록
#[tokio::test]
async fn test_threshold_rule_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("burst.yml"),
        "- id: true_burst\n  tier: low\n  pattern: 'execve\\(\"/usr/bin/true\"'\n  message: repeated true\n  threshold: 3\n",
    )
    .unwrap();
    let catalog = tracesentry_engine::load_catalog(Some(dir.path())).await.unwrap();

    let result = StreamPipeline::new(catalog, TerminationPolicy::default())
        .run(ScriptedProcess::new(spawn_lines(4)))
        .await
        .unwrap();

    assert_eq!(result.report.entries(RiskTier::Low).len(), 2);
}

/// 실제 프로세스: 상한 초과 시 SIGTERM으로 종료
#[cfg(unix)]
#[tokio::test]
async fn test_real_process_is_terminated_on_cap() {
    use std::process::Stdio;
    use std::time::Duration;

    use tracesentry_engine::ChildProcess;

    let script = format!(
        "i=0; while [ $i -lt 51 ]; do echo '{PLAIN_SPAWN}' >&2; i=$((i+1)); done; exec sleep 30"
    );
    let child = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .expect("spawn sh");
    let pid = child.id();

    let pipeline = StreamPipeline::new(catalog(), TerminationPolicy::default());
    let run = pipeline.run(ChildProcess::new(child));
    let result = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("traced process should be terminated before timeout")
        .unwrap();

    assert_eq!(
        result.outcome,
        RunOutcome::CapExceeded {
            spawns: 51,
            cap: 50,
            terminated_pid: pid,
        }
    );
}
