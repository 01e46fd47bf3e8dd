// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Launch sequences for external commands: place input files, run a blocking
//! install step, start one long-running child and relay its stdout/stderr to
//! the parent while it runs, then report how it ended.

pub mod config;
pub mod env;
pub mod error;
pub mod prepare;
pub mod process;
pub mod relay;
pub mod runner;

pub use config::{LaunchConfig, OutputMode};
pub use error::RunnerError;
pub use process::{CommandSpec, Completion, ProcessHandle};
pub use runner::Runner;
