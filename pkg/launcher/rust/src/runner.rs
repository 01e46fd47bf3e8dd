// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::{LaunchConfig, OutputMode};
use crate::error::{Result, RunnerError};
use crate::prepare::{FileCopy, prepare};
use crate::process::{CommandSpec, Completion, install_dependencies, launch};
use crate::relay::{PrefixedSink, RelaySink, StdioSink};
use log::{debug, info, warn};

/// Runs one launch sequence: prepare files, install, launch, relay, report.
///
/// Any setup failure ends the sequence at that step. A non-zero exit of the
/// launched process is a normal [`Completion`], not an error.
#[derive(Debug)]
pub struct Runner {
    name: String,
    prepare: Vec<FileCopy>,
    install: Option<CommandSpec>,
    command: CommandSpec,
    output: OutputMode,
    report_exit: bool,
    propagate_exit_code: bool,
}

impl Runner {
    /// Resolve `config` into concrete commands. Fails only if the
    /// environment file cannot be read.
    pub fn new(name: impl Into<String>, config: &LaunchConfig) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            prepare: config.prepare.clone(),
            install: config.install.as_ref().map(|i| i.command_spec()),
            command: config.command_spec()?,
            output: config.output,
            report_exit: config.report_exit,
            propagate_exit_code: config.propagate_exit_code,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_propagate_exit_code(&mut self, propagate: bool) {
        self.propagate_exit_code = propagate;
    }

    /// Run the sequence, relaying to the parent's own stdout and stderr.
    pub async fn run(&self) -> Result<Completion> {
        match self.output {
            OutputMode::Raw => self.run_with(&mut StdioSink, |_| {}).await,
            OutputMode::Prefixed => {
                self.run_with(&mut PrefixedSink::new(StdioSink), |_| {})
                    .await
            }
        }
    }

    /// Run the sequence into `sink`. `on_complete` is called once the process
    /// has exited and all of its output has been written; it is not called if
    /// a setup step fails.
    pub async fn run_with<S, F>(&self, sink: &mut S, on_complete: F) -> Result<Completion>
    where
        S: RelaySink + ?Sized,
        F: FnOnce(&Completion),
    {
        prepare(&self.prepare)?;

        if let Some(ref install) = self.install {
            install_dependencies(&self.name, install).await?;
        }

        let handle = launch(&self.name, &self.command)?;
        let (completion, stats) = handle.relay_to(sink).await?;
        debug!(
            "[{}] relayed {} chunk(s), {} stdout byte(s), {} stderr byte(s)",
            self.name, stats.chunks, stats.stdout_bytes, stats.stderr_bytes
        );

        if self.report_exit {
            sink.write_message(&format!("child process exited with {completion}\n"))
                .map_err(|source| RunnerError::Relay {
                    program: self.command.program.clone(),
                    source,
                })?;
        }
        if !completion.success() {
            warn!("[{}] {} failed with {completion}", self.name, self.command);
        }

        on_complete(&completion);
        Ok(completion)
    }

    /// The status the parent should exit with after `completion`.
    pub fn exit_code(&self, completion: Completion) -> i32 {
        if self.propagate_exit_code {
            completion.exit_code()
        } else {
            if !completion.success() {
                info!(
                    "[{}] exit code propagation disabled, ignoring {completion}",
                    self.name
                );
            }
            0
        }
    }
}
