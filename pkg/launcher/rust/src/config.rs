// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::env::parse_environment_file;
use crate::prepare::FileCopy;
use crate::process::CommandSpec;
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "AWYES_LAUNCHER_CONFIG_DIR";
const DEFAULT_CONFIG_DIR: &str = "launch.d";

/// Where the awyes package is installed relative to the project root.
pub const DEFAULT_PACKAGE_DIR: &str = "./node_modules/@the-sage-group/awyes";
pub const DEFAULT_DEPLOY_TASK: &str = "deploy";

fn default_true() -> bool {
    true
}

/// How child output reaches the parent's streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Bytes are passed through untouched.
    #[default]
    Raw,
    /// Each chunk is preceded by `stdout: ` or `stderr: `.
    Prefixed,
}

/// A command run to completion before the main process starts.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl InstallConfig {
    pub fn command_spec(&self) -> CommandSpec {
        CommandSpec {
            program: self.command.clone(),
            args: self.args.clone(),
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
        }
    }
}

/// One launch sequence: files to place, an optional install step, and the
/// process whose output is relayed.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prepare: Vec<FileCopy>,
    #[serde(default)]
    pub install: Option<InstallConfig>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub environment_file: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub output: OutputMode,
    /// Write `child process exited with ...` once the process closes.
    #[serde(default)]
    pub report_exit: bool,
    /// Exit with the child's status instead of 0.
    #[serde(default = "default_true")]
    pub propagate_exit_code: bool,
}

impl LaunchConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            description: None,
            prepare: Vec::new(),
            install: None,
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            environment_file: None,
            working_dir: None,
            output: OutputMode::Raw,
            report_exit: false,
            propagate_exit_code: true,
        }
    }

    /// Copy `awyes.ts` and `package.json` from `source_dir` into the cloudview
    /// client directory, `npm install` there, then run the cloudview dev
    /// server.
    pub fn cloudview(package_dir: &Path, source_dir: &Path) -> Self {
        let cloudview = package_dir.join("cloudview");
        let clients = cloudview.join("clients");
        Self {
            description: Some("Run the cloudview interface".to_string()),
            prepare: vec![
                FileCopy::new(source_dir.join("awyes.ts"), clients.join("awyes.ts")),
                FileCopy::new(
                    source_dir.join("package.json"),
                    clients.join("package.json"),
                ),
            ],
            install: Some(InstallConfig {
                command: "npm".to_string(),
                args: vec!["install".to_string()],
                working_dir: Some(clients),
                env: HashMap::new(),
            }),
            args: vec![
                "run".to_string(),
                "dev".to_string(),
                "--prefix".to_string(),
                cloudview.display().to_string(),
            ],
            ..Self::new("npm")
        }
    }

    /// Run `yarn <task>` with prefixed output and a final exit report.
    pub fn deploy(task: &str, working_dir: Option<PathBuf>) -> Self {
        Self {
            description: Some(format!("Run the {task} task")),
            args: vec![task.to_string()],
            working_dir,
            output: OutputMode::Prefixed,
            report_exit: true,
            ..Self::new("yarn")
        }
    }

    /// The main process, with `environment_file` entries merged under `env`.
    pub fn command_spec(&self) -> crate::error::Result<CommandSpec> {
        let mut env = HashMap::new();
        if let Some(ref path) = self.environment_file {
            env.extend(parse_environment_file(path)?);
        }
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(CommandSpec {
            program: self.command.clone(),
            args: self.args.clone(),
            working_dir: self.working_dir.clone(),
            env,
        })
    }
}

/// `--config-dir` if given, else `$AWYES_LAUNCHER_CONFIG_DIR`, else `./launch.d`.
pub fn config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Scan a directory for `*.yaml`/`*.yml` launch configs, sorted by file name.
/// The launch name is the file stem. Files that fail to parse are logged and
/// skipped.
pub fn load_configs(dir: &Path) -> Result<Vec<(String, LaunchConfig)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read config directory: {}", dir.display()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| match e {
            Ok(entry) => Some(entry.path()),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|path| {
            let keep = is_yaml(path);
            if !keep {
                debug!("skipping non-YAML file: {}", path.display());
            }
            keep
        })
        .collect();
    paths.sort();

    let mut configs = Vec::with_capacity(paths.len());
    for path in paths {
        match parse_config(&path) {
            Ok(config) => configs.push((launch_name(&path), config)),
            Err(e) => warn!("skipping {}: {e:#}", path.display()),
        }
    }
    Ok(configs)
}

/// Resolve `target` as a path to a config file, or else as a launch name in
/// `dir`.
pub fn find_config(target: &str, dir: &Path) -> Result<(String, LaunchConfig)> {
    let direct = Path::new(target);
    if direct.is_file() {
        return Ok((launch_name(direct), parse_config(direct)?));
    }

    for ext in ["yaml", "yml"] {
        let path = dir.join(format!("{target}.{ext}"));
        if path.is_file() {
            return Ok((target.to_string(), parse_config(&path)?));
        }
    }
    bail!(
        "no launch config named {target:?} (looked for a file and in {})",
        dir.display()
    )
}

fn launch_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

pub fn parse_config(path: &Path) -> Result<LaunchConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config: LaunchConfig =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
