//! 트레이서 명령 구성 및 실행
//!
//! 외부 시스템 콜 트레이서(기본 `strace`)의 인자를 만들고 실행합니다.
//! 엔진은 트레이서의 출력 형식(한 줄에 한 이벤트, 시스템 콜 이름으로 시작)에만 의존합니다.
//!
//! - 배치: `<program> -ff -e trace=<cats> -s <limit> -o <log> [<interpreter>] <target>`
//! - 스트리밍: `<program> -f -e trace=<cats> -s <limit> [<interpreter>] <target>` (stderr 파이프)

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracesentry_core::config::TracerConfig;
use tracesentry_core::error::SourceError;

use crate::audit;
use crate::error::EngineError;
use crate::pipeline::ChildProcess;

/// 트레이서 실행 명령
#[derive(Debug, Clone)]
pub struct TracerCommand {
    program: String,
    categories: Vec<String>,
    string_limit: usize,
    interpreter: Option<String>,
    target: PathBuf,
}

impl TracerCommand {
    /// 트레이서 설정과 대상 경로로 명령을 생성합니다.
    pub fn from_config(config: &TracerConfig, target: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            categories: config.categories.clone(),
            string_limit: config.string_limit,
            interpreter: Some(config.interpreter.clone()).filter(|i| !i.is_empty()),
            target: target.into(),
        }
    }

    /// 트레이서 실행 파일
    pub fn program(&self) -> &str {
        &self.program
    }

    /// 추적 대상 경로
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// 배치 모드 인자 (프로세스별 출력 파일 분할)
    pub fn batch_args(&self, log_file: &Path) -> Vec<String> {
        let mut args = vec!["-ff".to_owned()];
        self.push_common(&mut args);
        args.push("-o".to_owned());
        args.push(log_file.display().to_string());
        self.push_target(&mut args);
        args
    }

    /// 스트리밍 모드 인자 (출력은 stderr로)
    pub fn stream_args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_owned()];
        self.push_common(&mut args);
        self.push_target(&mut args);
        args
    }

    fn push_common(&self, args: &mut Vec<String>) {
        args.push("-e".to_owned());
        args.push(format!("trace={}", self.categories.join(",")));
        args.push("-s".to_owned());
        args.push(self.string_limit.to_string());
    }

    fn push_target(&self, args: &mut Vec<String>) {
        if let Some(interpreter) = &self.interpreter {
            args.push(interpreter.clone());
        }
        args.push(self.target.display().to_string());
    }

    /// 배치 모드로 트레이서를 실행하고 종료를 기다립니다.
    ///
    /// 대상의 stdout과 stderr는 운영자에게 그대로 전달됩니다.
    pub async fn run_batch(&self, log_file: &Path) -> Result<Option<i32>, EngineError> {
        let args = self.batch_args(log_file);
        self.emit_spawn(&args);
        tracing::info!(program = %self.program, ?args, "starting tracer (batch)");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        tracing::info!(exit_code = ?status.code(), "tracer finished");
        Ok(status.code())
    }

    /// 스트리밍 모드로 트레이서를 실행합니다 (stderr 파이프, stdout은 그대로 전달).
    pub fn spawn_stream(&self) -> Result<ChildProcess, EngineError> {
        let args = self.stream_args();
        self.emit_spawn(&args);
        tracing::info!(program = %self.program, ?args, "starting tracer (stream)");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        Ok(ChildProcess::new(child))
    }

    fn emit_spawn(&self, args: &[String]) {
        let mut audit_args = Vec::with_capacity(args.len() + 1);
        audit_args.push(self.program.as_str());
        audit_args.extend(args.iter().map(String::as_str));
        audit::emit("subprocess.Popen", &audit_args);
    }

    fn spawn_error(&self, e: std::io::Error) -> EngineError {
        SourceError::TracerSpawn {
            program: self.program.clone(),
            reason: e.to_string(),
        }
        .into()
    }
}
