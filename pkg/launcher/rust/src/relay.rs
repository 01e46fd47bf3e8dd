// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Child output as an event stream.
//!
//! Each output pipe of a child is drained by [`forward`], which turns every
//! read into an [`OutputChunk`] on a shared channel. [`relay`] consumes that
//! channel and hands each chunk, unchanged, to a [`RelaySink`]. Anything that
//! can produce chunks (a real pipe, or a test feeding the channel directly)
//! can drive the relay.

use std::fmt;
use std::io::{self, Write};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Capacity of the chunk channel between pipe readers and the relay.
pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// One read from one of the child's output pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: Stream,
    pub bytes: Vec<u8>,
}

impl OutputChunk {
    pub fn new(stream: Stream, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            stream,
            bytes: bytes.into(),
        }
    }
}

/// Destination of relayed output.
pub trait RelaySink {
    /// Write one chunk to the channel matching `stream`. Implementations must
    /// not hold bytes back past the end of this call.
    fn write_chunk(&mut self, stream: Stream, bytes: &[u8]) -> io::Result<()>;

    /// Write a message of the runner's own (not child output) to stdout.
    fn write_message(&mut self, message: &str) -> io::Result<()> {
        self.write_chunk(Stream::Stdout, message.as_bytes())
    }
}

impl<S: RelaySink + ?Sized> RelaySink for &mut S {
    fn write_chunk(&mut self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        (**self).write_chunk(stream, bytes)
    }

    fn write_message(&mut self, message: &str) -> io::Result<()> {
        (**self).write_message(message)
    }
}

/// The parent's own stdout and stderr. Every chunk is flushed immediately.
#[derive(Debug, Default)]
pub struct StdioSink;

impl RelaySink for StdioSink {
    fn write_chunk(&mut self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        match stream {
            Stream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            Stream::Stderr => {
                let mut err = io::stderr().lock();
                err.write_all(bytes)?;
                err.flush()
            }
        }
    }
}

/// Prepends a literal `stdout: ` or `stderr: ` to every chunk before passing
/// it on. Runner messages pass through unprefixed.
#[derive(Debug)]
pub struct PrefixedSink<S> {
    inner: S,
}

impl<S> PrefixedSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: RelaySink> RelaySink for PrefixedSink<S> {
    fn write_chunk(&mut self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        let prefix = format!("{stream}: ");
        let mut line = Vec::with_capacity(prefix.len() + bytes.len());
        line.extend_from_slice(prefix.as_bytes());
        line.extend_from_slice(bytes);
        self.inner.write_chunk(stream, &line)
    }

    fn write_message(&mut self, message: &str) -> io::Result<()> {
        self.inner.write_message(message)
    }
}

/// Records everything written to it, in order.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct MemorySink {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub chunks: Vec<OutputChunk>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl MemorySink {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl RelaySink for MemorySink {
    fn write_chunk(&mut self, stream: Stream, bytes: &[u8]) -> io::Result<()> {
        match stream {
            Stream::Stdout => self.stdout.extend_from_slice(bytes),
            Stream::Stderr => self.stderr.extend_from_slice(bytes),
        }
        self.chunks.push(OutputChunk::new(stream, bytes));
        Ok(())
    }
}

/// Totals for one relay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub chunks: u64,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
}

impl RelayStats {
    fn record(&mut self, chunk: &OutputChunk) {
        self.chunks += 1;
        let len = chunk.bytes.len() as u64;
        match chunk.stream {
            Stream::Stdout => self.stdout_bytes += len,
            Stream::Stderr => self.stderr_bytes += len,
        }
    }
}

/// Read `reader` until EOF, sending each read as a chunk tagged `stream`.
///
/// Returns early without error if the receiving side has gone away.
pub async fn forward<R>(
    mut reader: R,
    stream: Stream,
    tx: mpsc::Sender<OutputChunk>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = OutputChunk::new(stream, &buf[..n]);
        if tx.send(chunk).await.is_err() {
            return Ok(());
        }
    }
}

/// Drain `events` into `sink` until every sender has been dropped.
///
/// Chunks are written in arrival order, so the order within each stream is
/// the order the producer sent them.
pub async fn relay<S>(mut events: mpsc::Receiver<OutputChunk>, sink: &mut S) -> io::Result<RelayStats>
where
    S: RelaySink + ?Sized,
{
    let mut stats = RelayStats::default();
    while let Some(chunk) = events.recv().await {
        sink.write_chunk(chunk.stream, &chunk.bytes)?;
        stats.record(&chunk);
    }
    Ok(stats)
}
