// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::{Path, PathBuf};

use thiserror::Error;

use rigmux_core::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, String),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
}

/// Search order for `rigmuxd.toml`: current directory, then XDG config
/// dir, then `/etc`. Configuration *persistence* (migration, named
/// profiles) is out of scope — this is a single flat-file read.
pub fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("rigmuxd.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("rigmux").join("rigmuxd.toml"));
    }
    paths.push(PathBuf::from("/etc/rigmux/rigmuxd.toml"));
    paths
}

pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
}

/// Search the default paths and load the first file found. Returns
/// `(config, path)` or `None` if nothing was found — callers decide
/// whether an absent config is fatal (the binary) or fine (tests).
pub fn load_from_default_paths() -> Result<Option<(Config, PathBuf)>, ConfigError> {
    for path in default_search_paths() {
        if path.exists() {
            let cfg = load_from_file(&path)?;
            return Ok(Some((cfg, path)));
        }
    }
    Ok(None)
}
