//! 모니터 오케스트레이션 -- 카탈로그 로딩, 트레이서 실행, 파이프라인 선택
//!
//! # 실행 흐름
//! ```text
//! once:     TracerCommand::run_batch -> trace.log.<run>.* -> BatchPipeline
//! realtime: TracerCommand::spawn_stream -> stderr -> StreamPipeline (-> sink)
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::audit::AuditHook;
use crate::config::{MonitorMode, MonitorSettings};
use crate::error::EngineError;
use crate::pipeline::{BatchPipeline, RunResult, StreamPipeline};
use crate::rule::{RuleCatalog, RuleLoader};
use crate::tracer::TracerCommand;

/// 감사 훅 소유자 이름
pub const AUDIT_OWNER: &str = "tracesentry-monitor";

/// 모니터 -- 한 설정으로 여러 번 실행할 수 있습니다.
///
/// # 사용 예시
/// ```ignore
/// let monitor = Monitor::new(settings).await?;
/// let result = monitor.run("script.py").await?;
/// print!("{}", result.report);
/// ```
pub struct Monitor {
    settings: MonitorSettings,
    catalog: Arc<RuleCatalog>,
}

impl Monitor {
    /// 설정을 검증하고 규칙 카탈로그를 로드합니다.
    pub async fn new(settings: MonitorSettings) -> Result<Self, EngineError> {
        settings.validate()?;
        let catalog = load_catalog(settings.rule_dir.as_deref()).await?;
        Ok(Self { settings, catalog })
    }

    /// 이미 만들어진 카탈로그로 모니터를 생성합니다.
    pub fn with_catalog(
        settings: MonitorSettings,
        catalog: Arc<RuleCatalog>,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        Ok(Self { settings, catalog })
    }

    /// 실행 설정
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// 사용 중인 규칙 카탈로그
    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }

    /// 대상을 트레이서로 실행하며 분류합니다.
    pub async fn run(&self, target: impl AsRef<Path>) -> Result<RunResult, EngineError> {
        let target = target.as_ref();
        if self.settings.audit {
            AuditHook::install(AUDIT_OWNER)?;
        }

        let tracer = TracerCommand::from_config(&self.settings.tracer, target);
        tracing::info!(
            target = %target.display(),
            mode = %self.settings.mode,
            rules = self.catalog.len(),
            "monitoring started"
        );

        match self.settings.mode {
            MonitorMode::Once => {
                // 이전 실행이 남긴 trace.log.* 파일은 이번 실행에 섞이지 않아야 함
                let log_prefix = run_log_prefix(self.batch_log_file()?);
                tracing::debug!(prefix = %log_prefix.display(), "trace log prefix for this run");
                let exit_code = tracer.run_batch(&log_prefix).await?;
                if exit_code != Some(0) {
                    tracing::warn!(?exit_code, "tracer exited with non-zero status");
                }
                self.analyze(&log_prefix).await
            }
            MonitorMode::Realtime => {
                let process = tracer.spawn_stream()?;
                let mut pipeline = StreamPipeline::new(Arc::clone(&self.catalog), self.settings.policy);
                if let Some(sink) = &self.settings.log_file {
                    pipeline = pipeline.with_sink(sink);
                }
                pipeline.run(process).await
            }
        }
    }

    /// 이미 존재하는 트레이스 로그를 접두사로 찾아 분류합니다.
    pub async fn analyze(&self, prefix: impl AsRef<Path>) -> Result<RunResult, EngineError> {
        BatchPipeline::new(Arc::clone(&self.catalog), self.settings.policy)
            .run(prefix)
            .await
    }

    fn batch_log_file(&self) -> Result<&Path, EngineError> {
        self.settings
            .log_file
            .as_deref()
            .ok_or_else(|| EngineError::Config {
                field: "monitor.log_file".to_owned(),
                reason: "log file is required in 'once' mode".to_owned(),
            })
    }
}

/// 실행마다 고유한 로그 접두사: `<log_file>.<id>`
fn run_log_prefix(log_file: &Path) -> PathBuf {
    let mut name = OsString::from(log_file.as_os_str());
    name.push(format!(".{}", Uuid::new_v4().simple()));
    PathBuf::from(name)
}

/// 내장 규칙과 (있다면) 규칙 디렉토리의 YAML 규칙으로 카탈로그를 만듭니다.
pub async fn load_catalog(rule_dir: Option<&Path>) -> Result<Arc<RuleCatalog>, EngineError> {
    let catalog = match rule_dir {
        Some(dir) => {
            let extra = RuleLoader::load_directory(dir).await?;
            RuleCatalog::with_extra(extra)?
        }
        None => RuleCatalog::builtin()?,
    };
    tracing::debug!(rules = catalog.len(), "rule catalog ready");
    Ok(Arc::new(catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorSettingsBuilder;
    use crate::pipeline::RunOutcome;
    use tracesentry_core::config::TracerConfig;

    #[tokio::test]
    async fn load_catalog_without_dir_is_builtin() {
        let catalog = load_catalog(None).await.unwrap();
        assert_eq!(catalog.len(), 24);
    }

    #[tokio::test]
    async fn load_catalog_with_dir_appends_rules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("extra.yml"),
            "- id: curl_spawn\n  tier: medium\n  pattern: 'execve\\(\"/usr/bin/curl\"'\n  message: curl launched\n",
        )
        .unwrap();
        let catalog = load_catalog(Some(dir.path())).await.unwrap();
        assert_eq!(catalog.len(), 25);
        assert!(catalog.get("curl_spawn").is_some());
    }

    #[test]
    fn run_log_prefix_extends_configured_file() {
        let first = run_log_prefix(Path::new("/var/tmp/trace.log"));
        let second = run_log_prefix(Path::new("/var/tmp/trace.log"));
        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/var/tmp")));
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("trace.log."));
        assert_eq!(name.len(), "trace.log.".len() + 32);
    }

    /// `-o <prefix>`를 받으면 `<prefix>.<pid>`에 spawn 30줄을 쓰는 가짜 트레이서
    #[cfg(unix)]
    fn fake_tracer(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-strace");
        std::fs::write(
            &script,
            r#"#!/bin/sh
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
i=0
while [ $i -lt 30 ]; do
  echo 'execve("/bin/true", ["true"], 0x0) = 0'
  i=$((i + 1))
done > "$out.$$"
"#,
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn once_mode_ignores_logs_from_earlier_runs() {
        let dir = tempfile::tempdir().unwrap();
        let tracer = TracerConfig {
            program: fake_tracer(dir.path()).display().to_string(),
            interpreter: String::new(),
            ..TracerConfig::default()
        };
        let log = dir.path().join("trace.log");
        // 이전 실행과 realtime 싱크가 남긴 파일
        std::fs::write(
            dir.path().join("trace.log.4242"),
            "execve(\"/bin/true\", [\"true\"], 0x0) = 0\n".repeat(40),
        )
        .unwrap();
        std::fs::write(&log, "openat(AT_FDCWD, \"/etc/shadow\", O_RDONLY) = 3\n").unwrap();

        let settings = MonitorSettingsBuilder::new()
            .mode(MonitorMode::Once)
            .log_file(&log)
            .subprocess_cap(50)
            .tracer(tracer)
            .build()
            .unwrap();
        let monitor = Monitor::new(settings).await.unwrap();

        for _ in 0..2 {
            let result = monitor.run("target.py").await.unwrap();
            assert_eq!(result.outcome, RunOutcome::Completed);
            assert_eq!(result.counters.subprocess_spawns, 30);
            assert_eq!(result.lines, 30);
            assert!(result.report.high.is_empty());
        }
    }

    #[tokio::test]
    async fn analyze_uses_configured_policy() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("trace.log");
        let spawns: String = (0..3)
            .map(|_| "execve(\"/bin/true\", [\"true\"], 0x0) = 0\n")
            .collect();
        std::fs::write(&log, spawns).unwrap();

        let settings = MonitorSettingsBuilder::new()
            .log_file(&log)
            .subprocess_cap(2)
            .build()
            .unwrap();
        let monitor = Monitor::new(settings).await.unwrap();
        let result = monitor.analyze(&log).await.unwrap();
        assert!(matches!(
            result.outcome,
            RunOutcome::CapExceeded { spawns: 3, cap: 2, .. }
        ));
    }
}
