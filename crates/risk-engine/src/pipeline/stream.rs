//! 스트리밍 분류 파이프라인 -- 실행 중인 트레이서 출력 분석
//!
//! 트레이서의 출력이 도착하는 대로 한 줄씩 분류합니다. 다음 라인을 기다리는 것이
//! 유일한 대기 지점이며, 중단 정책이나 생성 상한이 발동하면 즉시 추적 대상을
//! 종료하고 읽기를 멈춥니다.
//!
//! 추적 대상 프로세스는 [`TracedProcess`] trait 뒤에 있어 테스트에서
//! 메모리 리더로 대체할 수 있습니다.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr};
use tracing::Instrument;
use tracesentry_core::error::SourceError;

use super::{LineVerdict, RunMode, RunOutcome, RunResult, RunState, normalize_line};
use crate::audit;
use crate::error::EngineError;
use crate::policy::TerminationPolicy;
use crate::rule::{LineClassifier, RuleCatalog};

/// 추적 대상 프로세스 추상화
///
/// 파이프라인은 출력 스트림을 한 번 가져가고, 필요하면 종료를 요청한 뒤
/// 항상 프로세스 종료를 기다립니다.
pub trait TracedProcess: Send {
    /// 트레이스 출력 스트림
    type Output: AsyncBufRead + Unpin + Send;

    /// 출력 스트림을 가져옵니다. 두 번째 호출부터는 `None`.
    fn take_output(&mut self) -> Option<Self::Output>;

    /// 프로세스 ID (이미 종료되었으면 `None`)
    fn id(&self) -> Option<u32>;

    /// 종료 신호를 보냅니다.
    fn terminate(&mut self) -> Result<(), EngineError>;

    /// 프로세스 종료를 기다리고 종료 코드를 반환합니다.
    fn wait(&mut self) -> impl Future<Output = Result<Option<i32>, EngineError>> + Send;
}

/// `tokio::process::Child` 기반 추적 대상
///
/// stderr가 파이프로 연결된 트레이서 프로세스를 감쌉니다.
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    /// 실행된 자식 프로세스를 감쌉니다. stderr는 `Stdio::piped()`여야 합니다.
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

impl TracedProcess for ChildProcess {
    type Output = BufReader<ChildStderr>;

    fn take_output(&mut self) -> Option<Self::Output> {
        self.child.stderr.take().map(BufReader::new)
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<(), EngineError> {
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        // SAFETY: kill(2)는 메모리를 건드리지 않으며, pid는 아직 회수되지 않은 자식입니다.
        let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if ret == 0 {
            Ok(())
        } else {
            Err(EngineError::Io(std::io::Error::last_os_error()))
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<(), EngineError> {
        self.child.start_kill().map_err(EngineError::Io)
    }

    async fn wait(&mut self) -> Result<Option<i32>, EngineError> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

/// 스트리밍 분류 파이프라인
///
/// # 사용 예시
/// ```ignore
/// let process = tracer.spawn_stream()?;
/// let pipeline = StreamPipeline::new(catalog, policy).with_sink("trace.log");
/// let result = pipeline.run(process).await?;
/// ```
pub struct StreamPipeline {
    classifier: LineClassifier,
    policy: TerminationPolicy,
    sink: Option<PathBuf>,
}

impl StreamPipeline {
    /// 카탈로그와 종료 정책으로 파이프라인을 생성합니다.
    pub fn new(catalog: Arc<RuleCatalog>, policy: TerminationPolicy) -> Self {
        Self {
            classifier: LineClassifier::new(catalog),
            policy,
            sink: None,
        }
    }

    /// 관측한 모든 라인을 기록할 파일을 설정합니다.
    pub fn with_sink(mut self, path: impl Into<PathBuf>) -> Self {
        self.sink = Some(path.into());
        self
    }

    /// 추적 대상의 출력을 끝까지 (또는 트리거가 발동할 때까지) 분류합니다.
    pub async fn run<P: TracedProcess>(&self, mut process: P) -> Result<RunResult, EngineError> {
        let state = RunState::new(RunMode::Stream, &self.classifier, self.policy);
        let span = tracing::info_span!(
            "run",
            run_id = %state.run_id(),
            mode = "stream",
            pid = process.id()
        );
        self.classify_stream(state, &mut process)
            .instrument(span)
            .await
    }

    async fn classify_stream<P: TracedProcess>(
        &self,
        mut state: RunState<'_>,
        process: &mut P,
    ) -> Result<RunResult, EngineError> {
        let mut sink = match &self.sink {
            Some(path) => Some(Sink::create(path).await?),
            None => None,
        };

        let mut reader = process.take_output().ok_or_else(|| SourceError::LogOpen {
            path: "<tracer output>".to_owned(),
            reason: "output stream is not available".to_owned(),
        })?;

        tracing::info!("stream classification started");

        let mut outcome = RunOutcome::Completed;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = normalize_line(&buf);

            if let Some(sink) = sink.as_mut() {
                sink.write_line(&line).await?;
            }

            match state.process_line(&line) {
                LineVerdict::Continue => {}
                LineVerdict::Abort {
                    rule_id,
                    message,
                    line,
                } => {
                    tracing::error!(rule_id = %rule_id, "{message}: {line}");
                    Self::terminate(process);
                    outcome = RunOutcome::PolicyAbort {
                        rule_id,
                        message,
                        line,
                    };
                    break;
                }
                LineVerdict::CapExceeded => {
                    let spawns = state.counters().subprocess_spawns;
                    let cap = state.policy().subprocess_cap;
                    let pid = process.id();
                    tracing::warn!(
                        spawns,
                        cap,
                        "too many subprocesses detected, terminating traced process"
                    );
                    Self::terminate(process);
                    outcome = RunOutcome::CapExceeded {
                        spawns,
                        cap,
                        terminated_pid: pid,
                    };
                    break;
                }
            }
        }

        // 더 이상 읽지 않으므로 파이프를 닫아 트레이서가 쓰기에서 막히지 않게 합니다
        drop(reader);
        let exit_code = process.wait().await?;
        tracing::debug!(?exit_code, "traced process exited");

        if let Some(sink) = sink {
            sink.close().await?;
        }

        Ok(state.finish(outcome))
    }

    fn terminate<P: TracedProcess>(process: &mut P) {
        let pid = process.id();
        match process.terminate() {
            Ok(()) => {
                metrics::counter!(tracesentry_core::metrics::TERMINATIONS_TOTAL).increment(1);
                tracing::info!(?pid, "sent termination signal to traced process");
            }
            // 이미 종료된 경우 등은 wait()에서 정리됩니다
            Err(e) => tracing::warn!(?pid, error = %e, "failed to terminate traced process"),
        }
    }
}

/// 관측 라인 기록 파일
struct Sink {
    path: PathBuf,
    writer: BufWriter<tokio::fs::File>,
}

impl Sink {
    async fn create(path: &Path) -> Result<Self, EngineError> {
        let path_arg = format!("path={}", path.display());
        audit::emit("open", &[path_arg.as_str(), "mode=w"]);

        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| EngineError::Sink {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    async fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        self.writer.write_all(line.as_bytes()).await.map_err(|e| self.error(e))?;
        self.writer.write_all(b"\n").await.map_err(|e| self.error(e))
    }

    async fn close(mut self) -> Result<(), EngineError> {
        self.writer.flush().await.map_err(|e| self.error(e))?;
        self.writer.shutdown().await.map_err(|e| self.error(e))
    }

    fn error(&self, e: std::io::Error) -> EngineError {
        EngineError::Sink {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
