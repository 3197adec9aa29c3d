//! git::mock
//!
//! Scripted collaborators for deterministic testing.
//!
//! # Design
//!
//! [`MockSpawner`] answers invocations from a script keyed by argument
//! patterns and records every call, so tests can assert both what the
//! engine ran and how it reacted to canned output. [`MemoryFileSystem`]
//! holds `.git` files in memory.
//!
//! A pattern matches when its tokens appear as a contiguous run inside the
//! argument vector. Patterns are tried newest first. Each pattern owns a
//! queue of responses; the last response repeats once the queue drains.
//!
//! # Example
//!
//! ```
//! use gitdeck::git::mock::{MockResponse, MockSpawner};
//! use gitdeck::git::process::{ExecOptions, ProcessSpawner};
//! use std::path::Path;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let spawner = MockSpawner::new();
//! spawner.on(&["--version"], MockResponse::ok("git version 2.40.0\n"));
//!
//! let out = spawner
//!     .execute(Path::new("git"), Path::new("/repo"), &["--version".to_string()], &ExecOptions::default())
//!     .await
//!     .unwrap();
//! assert_eq!(out.stdout, b"git version 2.40.0\n");
//! assert_eq!(spawner.call_count(), 1);
//! # });
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::fs::FileSystem;
use super::process::{ExecOptions, ProcessSpawner, ProcessStream, RawOutput, StreamEvent};

/// Canned result of one invocation.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub exit_code: Option<i32>,
    /// Stdout delivered in these chunks when streamed; concatenated when
    /// executed.
    pub stdout_chunks: Vec<Vec<u8>>,
    pub stderr: Vec<u8>,
    /// Simulated run time before the result is delivered.
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Successful run with the given stdout.
    pub fn ok(stdout: impl AsRef<[u8]>) -> Self {
        Self {
            exit_code: Some(0),
            stdout_chunks: vec![stdout.as_ref().to_vec()],
            stderr: Vec::new(),
            delay: None,
        }
    }

    /// Failed run (exit code 1 unless overridden) with the given stderr.
    pub fn fail(stderr: impl AsRef<[u8]>) -> Self {
        Self {
            exit_code: Some(1),
            stdout_chunks: Vec::new(),
            stderr: stderr.as_ref().to_vec(),
            delay: None,
        }
    }

    /// Successful run whose stdout is streamed in the given chunks.
    pub fn chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            exit_code: Some(0),
            stdout_chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            stderr: Vec::new(),
            delay: None,
        }
    }

    pub fn with_stdout(mut self, stdout: impl AsRef<[u8]>) -> Self {
        self.stdout_chunks = vec![stdout.as_ref().to_vec()];
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn stdout(&self) -> Vec<u8> {
        self.stdout_chunks.concat()
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub cwd: PathBuf,
    pub args: Vec<String>,
    pub input: Option<String>,
    pub streamed: bool,
}

impl RecordedCall {
    /// True when `pattern` appears contiguously in the arguments.
    pub fn matches(&self, pattern: &[&str]) -> bool {
        contains_run(&self.args, pattern)
    }
}

#[derive(Debug)]
struct Script {
    pattern: Vec<String>,
    responses: VecDeque<MockResponse>,
}

#[derive(Debug, Default)]
struct MockSpawnerInner {
    scripts: Vec<Script>,
    calls: Vec<RecordedCall>,
    kills: usize,
}

/// Scripted [`ProcessSpawner`].
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockSpawner {
    inner: Arc<Mutex<MockSpawnerInner>>,
}

fn contains_run(args: &[String], pattern: &[&str]) -> bool {
    if pattern.is_empty() {
        return true;
    }
    args.windows(pattern.len())
        .any(|w| w.iter().zip(pattern).all(|(a, p)| a == p))
}

impl MockSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for invocations matching `pattern`.
    pub fn on(&self, pattern: &[&str], response: MockResponse) -> &Self {
        let mut inner = self.inner.lock().expect("mock lock poisoned");
        let pattern: Vec<String> = pattern.iter().map(|s| s.to_string()).collect();
        if let Some(script) = inner.scripts.iter_mut().find(|s| s.pattern == pattern) {
            script.responses.push_back(response);
        } else {
            inner.scripts.push(Script {
                pattern,
                responses: VecDeque::from([response]),
            });
        }
        self
    }

    /// Replace every queued response for `pattern` with `response`.
    pub fn set(&self, pattern: &[&str], response: MockResponse) -> &Self {
        {
            let mut inner = self.inner.lock().expect("mock lock poisoned");
            inner
                .scripts
                .retain(|s| s.pattern.iter().map(String::as_str).ne(pattern.iter().copied()));
        }
        self.on(pattern, response)
    }

    /// All invocations so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().expect("mock lock poisoned").calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().expect("mock lock poisoned").calls.len()
    }

    /// Invocations whose arguments contain `pattern`.
    pub fn calls_matching(&self, pattern: &[&str]) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.matches(pattern))
            .collect()
    }

    /// Number of streams the engine killed.
    pub fn kill_count(&self) -> usize {
        self.inner.lock().expect("mock lock poisoned").kills
    }

    fn respond(&self, cwd: &Path, args: &[String], options: &ExecOptions, streamed: bool) -> MockResponse {
        let mut inner = self.inner.lock().expect("mock lock poisoned");
        inner.calls.push(RecordedCall {
            cwd: cwd.to_path_buf(),
            args: args.to_vec(),
            input: options.input.clone(),
            streamed,
        });

        // Newest pattern first so later scripts override earlier ones.
        let script = inner.scripts.iter_mut().rev().find(|s| {
            let pattern: Vec<&str> = s.pattern.iter().map(String::as_str).collect();
            contains_run(args, &pattern)
        });

        match script {
            Some(script) if script.responses.len() > 1 => {
                script.responses.pop_front().unwrap_or_else(|| MockResponse::ok(""))
            }
            Some(script) => script
                .responses
                .front()
                .cloned()
                .unwrap_or_else(|| MockResponse::ok("")),
            None => MockResponse::ok(""),
        }
    }
}

#[async_trait]
impl ProcessSpawner for MockSpawner {
    async fn execute(
        &self,
        _program: &Path,
        cwd: &Path,
        args: &[String],
        options: &ExecOptions,
    ) -> io::Result<RawOutput> {
        let response = self.respond(cwd, args, options, false);
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(RawOutput {
            exit_code: response.exit_code,
            stdout: response.stdout(),
            stderr: response.stderr,
        })
    }

    async fn stream(
        &self,
        _program: &Path,
        cwd: &Path,
        args: &[String],
        options: &ExecOptions,
    ) -> io::Result<ProcessStream> {
        let response = self.respond(cwd, args, options, true);
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        for chunk in response.stdout_chunks {
            let _ = tx.send(StreamEvent::Stdout(chunk));
        }
        if !response.stderr.is_empty() {
            let _ = tx.send(StreamEvent::Stderr(response.stderr));
        }
        let _ = tx.send(StreamEvent::Exit(response.exit_code));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            if kill_rx.await.is_ok() {
                inner.lock().expect("mock lock poisoned").kills += 1;
            }
        });

        Ok(ProcessStream::new(rx, kill_tx))
    }
}

/// In-memory [`FileSystem`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    inner: Arc<Mutex<MemoryFsInner>>,
}

#[derive(Debug, Default)]
struct MemoryFsInner {
    files: HashMap<PathBuf, String>,
    dirs: HashSet<PathBuf>,
    reads: usize,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, path: impl Into<PathBuf>, contents: impl Into<String>) -> &Self {
        self.inner
            .lock()
            .expect("fs lock poisoned")
            .files
            .insert(path.into(), contents.into());
        self
    }

    pub fn mkdir(&self, path: impl Into<PathBuf>) -> &Self {
        self.inner
            .lock()
            .expect("fs lock poisoned")
            .dirs
            .insert(path.into());
        self
    }

    pub fn remove(&self, path: &Path) -> &Self {
        let mut inner = self.inner.lock().expect("fs lock poisoned");
        inner.files.remove(path);
        inner.dirs.remove(path);
        self
    }

    /// Number of `read_to_string` calls served.
    pub fn read_count(&self) -> usize {
        self.inner.lock().expect("fs lock poisoned").reads
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn exists(&self, path: &Path) -> bool {
        let inner = self.inner.lock().expect("fs lock poisoned");
        inner.files.contains_key(path)
            || inner.dirs.contains(path)
            || inner.files.keys().any(|f| f.starts_with(path))
    }

    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let mut inner = self.inner.lock().expect("fs lock poisoned");
        inner.reads += 1;
        inner.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
        })
    }
}
