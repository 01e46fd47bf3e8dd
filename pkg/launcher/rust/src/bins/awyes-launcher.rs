// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use awyes_launcher::config::{
    self, DEFAULT_DEPLOY_TASK, DEFAULT_PACKAGE_DIR, LaunchConfig, find_config, load_configs,
};
use awyes_launcher::Runner;
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "awyes-launcher", version)]
#[command(about = "Prepare, install and run external commands, relaying their output", long_about = None)]
struct Cli {
    /// Log verbosity (error, warn, info, debug, trace, off)
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    /// Exit 0 once the child finishes, whatever its status
    #[arg(long, global = true)]
    no_propagate_exit_code: bool,

    /// Directory holding named launch configs
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy the client files into cloudview, install its dependencies and run
    /// the dev server
    Cloudview {
        /// Installed awyes package
        #[arg(long, default_value = DEFAULT_PACKAGE_DIR)]
        package_dir: PathBuf,
        /// Directory holding awyes.ts and package.json
        #[arg(long, default_value = ".")]
        source_dir: PathBuf,
    },
    /// Run the deploy task through yarn
    Deploy {
        /// Task name passed to yarn
        #[arg(long, default_value = DEFAULT_DEPLOY_TASK)]
        task: String,
        #[arg(long)]
        working_dir: Option<PathBuf>,
    },
    /// Run a launch config, given as a file path or a name in the config dir
    Run { target: String },
    /// List the launch configs in the config dir
    List,
}

#[allow(clippy::print_stderr)]
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = SimpleLogger::new().with_level(cli.log_level).init() {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config_dir = config::config_dir(cli.config_dir.as_deref());
    let (name, config) = match cli.command {
        Commands::Cloudview {
            package_dir,
            source_dir,
        } => (
            "cloudview".to_string(),
            LaunchConfig::cloudview(&package_dir, &source_dir),
        ),
        Commands::Deploy { task, working_dir } => {
            ("deploy".to_string(), LaunchConfig::deploy(&task, working_dir))
        }
        Commands::Run { target } => find_config(&target, &config_dir)?,
        Commands::List => {
            list(&config_dir)?;
            return Ok(0);
        }
    };

    let mut runner = Runner::new(&name, &config)
        .with_context(|| format!("[{name}] invalid launch config"))?;
    if cli.no_propagate_exit_code {
        runner.set_propagate_exit_code(false);
    }
    if let Some(ref description) = config.description {
        info!("[{}] {description}", runner.name());
    }

    let completion = runner
        .run()
        .await
        .with_context(|| format!("[{}] launch sequence failed", runner.name()))?;
    Ok(u8::try_from(runner.exit_code(completion)).unwrap_or(1))
}

#[allow(clippy::print_stdout)]
fn list(dir: &std::path::Path) -> Result<()> {
    let configs = load_configs(dir)?;
    info!("loaded {} launch config(s) from {}", configs.len(), dir.display());
    for (name, config) in configs {
        match config.description {
            Some(description) => println!("{name}\t{description}"),
            None => println!("{name}"),
        }
    }
    Ok(())
}
