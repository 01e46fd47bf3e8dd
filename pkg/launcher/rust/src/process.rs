// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Result, RunnerError};
use crate::relay::{self, CHANNEL_CAPACITY, OutputChunk, RelaySink, RelayStats, Stream};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Upper bound on installer output kept per stream: stdout for the debug log,
/// stderr for the `Install` error.
const INSTALL_TAIL_BYTES: usize = 4 * 1024;

/// What to run and where.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn command(&self) -> Result<Command> {
        if let Some(ref dir) = self.working_dir
            && !dir.is_dir()
        {
            return Err(RunnerError::MissingWorkingDir {
                program: self.program.clone(),
                dir: dir.clone(),
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env).stdin(Stdio::null());
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }

    fn spawn_error(&self, source: std::io::Error) -> RunnerError {
        RunnerError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Exited(i32),
    Signaled(i32),
}

impl Completion {
    pub fn success(self) -> bool {
        self == Completion::Exited(0)
    }

    pub fn code(self) -> Option<i32> {
        match self {
            Completion::Exited(code) => Some(code),
            Completion::Signaled(_) => None,
        }
    }

    /// Shell convention: the exit code, or 128 + signal number.
    pub fn exit_code(self) -> i32 {
        match self {
            Completion::Exited(code) => code,
            Completion::Signaled(sig) => 128 + sig,
        }
    }
}

impl From<ExitStatus> for Completion {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Completion::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Completion::Signaled(sig);
            }
        }
        Completion::Exited(1)
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Exited(code) => write!(f, "code {code}"),
            Completion::Signaled(sig) => write!(f, "signal {sig}"),
        }
    }
}

/// A live child whose stdout and stderr are being read.
///
/// Consumed by [`ProcessHandle::relay_to`], so a handle cannot outlive its
/// process or be waited on twice.
pub struct ProcessHandle {
    name: String,
    program: String,
    child: Child,
    events: mpsc::Receiver<OutputChunk>,
    readers: Vec<JoinHandle<std::io::Result<()>>>,
}

impl ProcessHandle {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relay output into `sink` until both pipes close, then reap the child.
    pub async fn relay_to<S>(mut self, sink: &mut S) -> Result<(Completion, RelayStats)>
    where
        S: RelaySink + ?Sized,
    {
        let stats = relay::relay(self.events, sink)
            .await
            .map_err(|source| RunnerError::Relay {
                program: self.program.clone(),
                source,
            })?;

        for reader in self.readers {
            match reader.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("[{}] output pipe read failed: {e}", self.name),
                Err(e) => warn!("[{}] output reader task failed: {e}", self.name),
            }
        }

        let status = self
            .child
            .wait()
            .await
            .map_err(|source| RunnerError::Wait {
                program: self.program.clone(),
                source,
            })?;
        let completion = Completion::from(status);
        info!("[{}] exited with {completion}", self.name);
        Ok((completion, stats))
    }
}

/// Start `spec` without waiting for it. Its stdout and stderr are piped and
/// drained into the handle's event stream from the moment it starts.
pub fn launch(name: &str, spec: &CommandSpec) -> Result<ProcessHandle> {
    let mut cmd = spec.command()?;
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| spec.spawn_error(e))?;
    info!(
        "[{name}] spawned (pid={}, cmd={spec})",
        child.id().unwrap_or(0)
    );

    let (tx, events) = mpsc::channel(CHANNEL_CAPACITY);
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(relay::forward(stdout, Stream::Stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(relay::forward(stderr, Stream::Stderr, tx)));
    }

    Ok(ProcessHandle {
        name: name.to_string(),
        program: spec.program.clone(),
        child,
        events,
        readers,
    })
}

/// Run a setup command to completion before anything depends on it.
///
/// Output is drained rather than relayed, keeping only the last
/// `INSTALL_TAIL_BYTES` of each stream. A non-zero exit is an `Install` error
/// carrying the tail of the installer's stderr.
pub async fn install_dependencies(name: &str, spec: &CommandSpec) -> Result<()> {
    let mut cmd = spec.command()?;
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    info!(
        "[{name}] installing dependencies: {spec} (cwd={})",
        spec.working_dir
            .as_deref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| ".".to_string())
    );

    let mut child = cmd.spawn().map_err(|e| spec.spawn_error(e))?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout, stderr, status) = tokio::join!(
        read_tail(stdout, INSTALL_TAIL_BYTES),
        read_tail(stderr, INSTALL_TAIL_BYTES),
        child.wait(),
    );
    let wait_error = |source| RunnerError::Wait {
        program: spec.program.clone(),
        source,
    };
    let status = status.map_err(wait_error)?;
    let stdout = stdout.map_err(wait_error)?;
    let stderr = stderr.map_err(wait_error)?;

    if !stdout.is_empty() {
        debug!("[{name}] install output:\n{}", stdout.trim_end());
    }

    if !status.success() {
        return Err(RunnerError::Install {
            program: spec.to_string(),
            status: status.to_string(),
            stderr,
        });
    }
    info!("[{name}] dependencies installed");
    Ok(())
}

/// Drain `reader` to EOF, keeping at most the last `max` bytes.
async fn read_tail<R>(reader: Option<R>, max: usize) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(String::new());
    };
    let mut kept = Vec::with_capacity(max);
    let mut buf = [0u8; 4096];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        kept.extend_from_slice(&buf[..n]);
        if kept.len() > max {
            kept.drain(..kept.len() - max);
        }
    }
    Ok(String::from_utf8_lossy(&kept).into_owned())
}
