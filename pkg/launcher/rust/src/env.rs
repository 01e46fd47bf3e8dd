// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Result, RunnerError};
use std::path::Path;

/// Read a dotenv/systemd-style file into ordered `(key, value)` pairs.
///
/// Accepted lines are `KEY=VALUE`, optionally preceded by `export `. A value
/// wrapped in a matching pair of single or double quotes is unwrapped. Blank
/// lines, `#` comments and lines without `=` are ignored. Later entries for
/// the same key override earlier ones once collected into a map.
pub fn parse_environment_file(path: &Path) -> Result<Vec<(String, String)>> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| RunnerError::Environment {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parse_environment(&contents))
}

fn parse_environment(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, raw) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(raw.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
