//! # Command Execution Module / 命令执行模块
//!
//! Spawns subprocesses, feeds their standard input, captures standard output
//! and standard error separately and enforces a wall-clock timeout.
//!
//! 派生子进程、写入标准输入、分别捕获标准输出与标准错误，并强制执行墙钟超时。

use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::{AbortHandle, JoinHandle};

use crate::core::models::CapturedOutput;

/// Why a subprocess did not produce a [`CapturedOutput`].
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to start process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("process timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to get process status: {0}")]
    Wait(#[source] std::io::Error),
}

/// Spawns `cmd`, writes `stdin` to it (if any), and captures stdout and
/// stderr until the process exits and both streams are closed, or until
/// `timeout` elapses.
///
/// The output streams are read concurrently by separate tasks. On timeout the
/// child is killed, the reader tasks are aborted and [`ExecError::Timeout`]
/// is returned.
///
/// 派生 `cmd`，写入 `stdin`（如有），并捕获 stdout 与 stderr，直到进程退出且两个流均关闭，
/// 或直到超时。超时后子进程被终止、读取任务被取消，并返回 `ExecError::Timeout`。
pub async fn run_with_timeout(
    mut cmd: Command,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<CapturedOutput, ExecError> {
    let mut child = cmd
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(ExecError::Spawn)?;

    // The child may exit without reading its input; a broken pipe is expected then.
    let stdin_handle = match (child.stdin.take(), stdin) {
        (Some(mut pipe), Some(data)) => Some(tokio::spawn(async move {
            let _ = pipe.write_all(&data).await;
            let _ = pipe.shutdown().await;
        })),
        _ => None,
    };

    let stdout_handle = child.stdout.take().map(|mut stdout| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf).await;
            buf
        })
    });
    let stderr_handle = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            buf
        })
    });

    let readers: Vec<AbortHandle> = stdin_handle
        .iter()
        .map(JoinHandle::abort_handle)
        .chain(stdout_handle.iter().map(JoinHandle::abort_handle))
        .chain(stderr_handle.iter().map(JoinHandle::abort_handle))
        .collect();

    // A background process that inherited the pipes keeps them open after the
    // child exits, so the deadline covers draining as well as waiting.
    let capture = async {
        let status = child.wait().await.map_err(ExecError::Wait)?;
        if let Some(handle) = stdin_handle {
            let _ = handle.await;
        }
        let stdout = collect(stdout_handle).await;
        let stderr = collect(stderr_handle).await;
        Ok::<_, ExecError>(CapturedOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            return_code: exit_code(&status),
        })
    };

    match tokio::time::timeout(timeout, capture).await {
        Ok(result) => result,
        Err(_) => {
            let _ = child.kill().await;
            for reader in &readers {
                reader.abort();
            }
            Err(ExecError::Timeout(timeout))
        }
    }
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            eprintln!("Failed to join output reader task: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

/// Exit code of a finished process; processes killed by a signal report the
/// negated signal number.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Joins a program and its arguments into one shell-quoted command line.
pub fn display_command(program: &str, args: &[String]) -> String {
    let parts = std::iter::once(program).chain(args.iter().map(String::as_str));
    shlex::try_join(parts).unwrap_or_else(|_| {
        std::iter::once(program)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    })
}
