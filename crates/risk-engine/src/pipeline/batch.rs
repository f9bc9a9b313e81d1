//! 배치 분류 파이프라인 -- 완료된 트레이스 로그 분석
//!
//! 트레이서는 프로세스/스레드별로 출력을 나눌 수 있으므로(`trace.log.1234`),
//! 로그 경로 접두사와 일치하는 모든 파일을 이름순으로 읽습니다.
//! 서브프로세스 상한은 모든 파일을 읽은 뒤 한 번만 평가하며, 읽기 도중 멈추지 않습니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::Instrument;
use tracesentry_core::error::SourceError;
use tracesentry_core::types::RiskTier;

use super::{LineVerdict, RunMode, RunOutcome, RunResult, RunState, normalize_line};
use crate::audit;
use crate::counters::CapStatus;
use crate::error::EngineError;
use crate::policy::TerminationPolicy;
use crate::rule::{LineClassifier, RuleCatalog};

/// 로그 경로 접두사와 일치하는 파일을 이름순으로 찾습니다.
///
/// `dir/trace.log`는 `dir` 안에서 이름이 `trace.log`로 시작하는 모든 파일과 일치합니다.
///
/// # Errors
/// 디렉토리를 읽을 수 없거나 일치하는 파일이 없으면 `SourceUnavailable`.
pub async fn discover_logs(prefix: impl AsRef<Path>) -> Result<Vec<PathBuf>, EngineError> {
    let prefix = prefix.as_ref();
    let dir = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name_prefix = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|e| SourceError::LogOpen {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        if !file_name.to_string_lossy().starts_with(&name_prefix) {
            continue;
        }
        if entry.file_type().await?.is_file() {
            paths.push(entry.path());
        }
    }

    if paths.is_empty() {
        return Err(SourceError::NoLogFiles {
            prefix: prefix.display().to_string(),
        }
        .into());
    }

    paths.sort();
    Ok(paths)
}

/// 배치 분류 파이프라인
///
/// # 사용 예시
/// ```ignore
/// let pipeline = BatchPipeline::new(catalog, TerminationPolicy::default());
/// let result = pipeline.run("trace.log").await?;
/// print!("{}", result.report);
/// ```
pub struct BatchPipeline {
    classifier: LineClassifier,
    policy: TerminationPolicy,
}

impl BatchPipeline {
    /// 카탈로그와 종료 정책으로 파이프라인을 생성합니다.
    pub fn new(catalog: Arc<RuleCatalog>, policy: TerminationPolicy) -> Self {
        Self {
            classifier: LineClassifier::new(catalog),
            policy,
        }
    }

    /// 접두사와 일치하는 로그 파일을 모두 분류합니다.
    pub async fn run(&self, prefix: impl AsRef<Path>) -> Result<RunResult, EngineError> {
        let paths = discover_logs(prefix).await?;
        self.run_files(&paths).await
    }

    /// 주어진 파일들을 순서대로 분류합니다.
    pub async fn run_files(&self, paths: &[PathBuf]) -> Result<RunResult, EngineError> {
        let state = RunState::new(RunMode::Batch, &self.classifier, self.policy);
        let span = tracing::info_span!("run", run_id = %state.run_id(), mode = "batch");
        Self::classify_all(state, paths).instrument(span).await
    }

    async fn classify_all(
        mut state: RunState<'_>,
        paths: &[PathBuf],
    ) -> Result<RunResult, EngineError> {
        tracing::info!(files = paths.len(), "batch classification started");

        for path in paths {
            if let Some(outcome) = Self::classify_file(&mut state, path).await? {
                return Ok(state.finish(outcome));
            }
        }

        let policy = state.policy();
        let outcome = match state.counters().cap_status(policy.subprocess_cap) {
            CapStatus::Ok => RunOutcome::Completed,
            CapStatus::Exceeded => {
                let spawns = state.counters().subprocess_spawns;
                tracing::warn!(spawns, cap = policy.subprocess_cap, "subprocess cap exceeded");
                state.report_mut().push(
                    RiskTier::High,
                    format!("Too many subprocesses detected: {spawns}, monitoring terminated"),
                );
                RunOutcome::CapExceeded {
                    spawns,
                    cap: policy.subprocess_cap,
                    terminated_pid: None,
                }
            }
        };

        Ok(state.finish(outcome))
    }

    /// 파일 하나를 분류합니다. 중단 정책이 발동하면 종료 사유를 반환합니다.
    async fn classify_file(
        state: &mut RunState<'_>,
        path: &Path,
    ) -> Result<Option<RunOutcome>, EngineError> {
        let path_arg = format!("path={}", path.display());
        audit::emit("open", &[path_arg.as_str()]);

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| SourceError::LogOpen {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(path = %path.display(), "reading trace log");

        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            let line = normalize_line(&buf);

            // 배치 모드의 상한 초과는 모든 파일을 읽은 뒤에 처리합니다
            if let LineVerdict::Abort {
                rule_id,
                message,
                line,
            } = state.process_line(&line)
            {
                tracing::error!(
                    rule_id = %rule_id,
                    path = %path.display(),
                    "{message}: {line}"
                );
                return Ok(Some(RunOutcome::PolicyAbort {
                    rule_id,
                    message,
                    line,
                }));
            }
        }
    }
}
