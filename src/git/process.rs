//! git::process
//!
//! Process collaborator: the boundary between the engine and the OS.
//!
//! # Design
//!
//! The engine never spawns processes itself. It talks to a
//! [`ProcessSpawner`], which offers single-shot execution and streaming.
//! [`TokioSpawner`] is the production implementation; tests use
//! [`crate::git::mock::MockSpawner`].
//!
//! Output is returned as raw bytes. Status output is NUL-framed and may
//! split multi-byte characters across chunks, so decoding is left to the
//! consumer.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

/// Options for one invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Extra environment variables.
    pub env: HashMap<String, String>,
    /// Text written to stdin, which is then closed.
    pub input: Option<String>,
    /// Force full stdout logging for this invocation.
    pub log_output: bool,
}

impl ExecOptions {
    pub fn with_input(input: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            ..Default::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Incremental notification from a streaming process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    /// The process exited; no further events follow.
    Exit(Option<i32>),
}

/// Handle to a running process.
///
/// Events arrive in order per stream; `Exit` is always last.
#[derive(Debug)]
pub struct ProcessStream {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    kill: Option<oneshot::Sender<()>>,
    command: String,
    started: Instant,
    elapsed: Option<Duration>,
}

impl ProcessStream {
    pub fn new(
        events: mpsc::UnboundedReceiver<StreamEvent>,
        kill: oneshot::Sender<()>,
    ) -> Self {
        Self {
            events,
            kill: Some(kill),
            command: String::new(),
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Label the stream and measure from `started` instead of construction.
    pub fn timed(mut self, command: impl Into<String>, started: Instant) -> Self {
        self.command = command.into();
        self.started = started;
        self
    }

    /// Next event, or `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        let event = self.events.recv().await;
        if let Some(StreamEvent::Exit(code)) = &event {
            let elapsed_ms = self.finish().as_millis() as u64;
            debug!(command = %self.command, elapsed_ms, exit_code = ?code, "git");
        }
        event
    }

    /// Ask the process to terminate. Idempotent.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill.take() {
            let _ = tx.send(());
            let elapsed_ms = self.finish().as_millis() as u64;
            debug!(command = %self.command, elapsed_ms, "git killed");
        }
    }

    /// Time from spawn to exit or kill, once either has happened.
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    fn finish(&mut self) -> Duration {
        *self.elapsed.get_or_insert_with(|| self.started.elapsed())
    }
}

/// Spawns processes on behalf of the engine.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Run to completion and capture output.
    async fn execute(
        &self,
        program: &Path,
        cwd: &Path,
        args: &[String],
        options: &ExecOptions,
    ) -> io::Result<RawOutput>;

    /// Start a process and stream its output.
    async fn stream(
        &self,
        program: &Path,
        cwd: &Path,
        args: &[String],
        options: &ExecOptions,
    ) -> io::Result<ProcessStream>;
}

/// [`ProcessSpawner`] backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner;

impl TokioSpawner {
    fn command(program: &Path, cwd: &Path, args: &[String], options: &ExecOptions) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(cwd);
        for (k, v) in &options.env {
            cmd.env(k, v);
        }
        cmd.stdin(if options.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ProcessSpawner for TokioSpawner {
    async fn execute(
        &self,
        program: &Path,
        cwd: &Path,
        args: &[String],
        options: &ExecOptions,
    ) -> io::Result<RawOutput> {
        let mut child = Self::command(program, cwd, args, options).spawn()?;

        if let (Some(input), Some(mut stdin)) = (&options.input, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        Ok(RawOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    async fn stream(
        &self,
        program: &Path,
        cwd: &Path,
        args: &[String],
        options: &ExecOptions,
    ) -> io::Result<ProcessStream> {
        let mut child = Self::command(program, cwd, args, options).spawn()?;

        if let (Some(input), Some(mut stdin)) = (options.input.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                let _ = stdin.write_all(input.as_bytes()).await;
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let stdout_task = child.stdout.take().map(|mut out| {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 64 * 1024];
                while let Ok(n) = out.read(&mut buf).await {
                    if n == 0 || tx.send(StreamEvent::Stdout(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            })
        });
        let stderr_task = child.stderr.take().map(|mut err| {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 16 * 1024];
                while let Ok(n) = err.read(&mut buf).await {
                    if n == 0 || tx.send(StreamEvent::Stderr(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            })
        });

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status.ok(),
                _ = kill_rx => {
                    let _ = child.kill().await;
                    child.wait().await.ok()
                }
            };
            // Drain readers so Exit is the final event.
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }
            let _ = tx.send(StreamEvent::Exit(status.and_then(|s| s.code())));
        });

        Ok(ProcessStream::new(rx, kill_tx))
    }
}
