// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Captured result of one `awyes-launcher` invocation.
pub struct LauncherOutput {
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl LauncherOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Builder around the launcher binary with a private working directory.
pub struct Launcher {
    cwd: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl Launcher {
    pub fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.push((key.to_string(), value.into()));
        self
    }

    /// Put `dir` in front of PATH so fake tools shadow real ones.
    pub fn with_path_prefix(self, dir: &Path) -> Self {
        let path = std::env::var("PATH").unwrap_or_default();
        self.env("PATH", format!("{}:{path}", dir.display()))
    }

    pub fn output(self) -> LauncherOutput {
        let bin = env!("CARGO_BIN_EXE_awyes-launcher");
        let out = Command::new(bin)
            .args(&self.args)
            .env_remove("AWYES_LAUNCHER_CONFIG_DIR")
            .envs(self.env)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .expect("failed to run awyes-launcher");

        let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
        eprintln!("[launcher:err] {stderr}");
        LauncherOutput {
            code: out.status.code(),
            stdout: out.stdout,
            stderr,
        }
    }
}

/// Write a YAML launch config named `name` into `dir`.
pub fn write_config(dir: &Path, name: &str, yaml: &str) -> PathBuf {
    let path = dir.join(format!("{name}.yaml"));
    std::fs::write(&path, yaml)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

/// Write an executable shell script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
