// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = RunnerError> = std::result::Result<T, E>;

/// Failures of the launch sequence. Every variant is fatal: the sequence
/// stops at the step that produced it.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("copy {} -> {}: {source}", .from.display(), .to.display())]
    Io {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading environment file {}: {source}", .path.display())]
    Environment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("working directory for {program} does not exist: {}", .dir.display())]
    MissingWorkingDir { program: String, dir: PathBuf },

    #[error("install step {program} failed ({status}){}", stderr_suffix(.stderr))]
    Install {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("relaying output of {program}: {source}")]
    Relay {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    /// Spawn-time failures: the executable or its working directory is unusable.
    pub fn is_spawn_error(&self) -> bool {
        matches!(
            self,
            RunnerError::Spawn { .. } | RunnerError::MissingWorkingDir { .. }
        )
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
