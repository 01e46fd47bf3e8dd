// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Result, RunnerError};
use log::{debug, info};
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};

/// One file to place before launch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileCopy {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl FileCopy {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }

    fn error(&self, source: io::Error) -> RunnerError {
        RunnerError::Io {
            from: self.source.clone(),
            to: self.destination.clone(),
            source,
        }
    }
}

/// Copy every source over its destination, creating missing parent
/// directories.
///
/// All sources are checked up front so that a missing source, or a
/// destination that is the source itself, fails the step before any
/// destination is written. There is no rollback of copies already
/// made if a later write fails.
pub fn prepare(files: &[FileCopy]) -> Result<()> {
    for file in files {
        if !file.source.is_file() {
            return Err(file.error(io::Error::new(
                io::ErrorKind::NotFound,
                "source file does not exist",
            )));
        }
        if is_same_file(&file.source, &file.destination) {
            return Err(file.error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source and destination are the same file",
            )));
        }
    }

    for file in files {
        if let Some(parent) = file.destination.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| file.error(e))?;
        }
        let bytes = std::fs::copy(&file.source, &file.destination).map_err(|e| file.error(e))?;
        debug!(
            "copied {} -> {} ({bytes} bytes)",
            file.source.display(),
            file.destination.display()
        );
    }

    if !files.is_empty() {
        info!("prepared {} file(s)", files.len());
    }
    Ok(())
}

/// Whether both paths resolve to one existing file. Copying a file onto
/// itself truncates it.
#[cfg(unix)]
fn is_same_file(source: &Path, destination: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(source), std::fs::metadata(destination)) {
        (Ok(s), Ok(d)) => s.dev() == d.dev() && s.ino() == d.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (source.canonicalize(), destination.canonicalize()) {
        (Ok(s), Ok(d)) => s == d,
        _ => false,
    }
}
