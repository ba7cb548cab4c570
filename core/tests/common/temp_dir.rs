// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Temporary directory management for integration tests.

use std::path::PathBuf;

use tempfile::TempDir;
use tokio::fs;

/// Temporary directories used for testing, removed when dropped.
#[derive(Debug)]
pub struct TempDirs {
    _base: TempDir,
    /// Directory holding config files.
    pub config_dir: PathBuf,
    /// State directory for database files.
    pub state_dir: PathBuf,
}

impl TempDirs {
    /// Path of the database inside the state directory.
    #[must_use]
    #[allow(dead_code)]
    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("davsync.db")
    }

    /// Writes `content` as a config file and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if file writing fails.
    #[allow(dead_code)]
    pub async fn write_config(&self, content: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.config_dir.join("config.toml");
        fs::write(&path, content).await?;
        Ok(path)
    }
}

/// Creates a config and a state directory under one temporary base.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub async fn setup_temp_dirs() -> Result<TempDirs, Box<dyn std::error::Error>> {
    let base = tempfile::tempdir()?;
    let config_dir = base.path().join("config");
    let state_dir = base.path().join("state");

    fs::create_dir_all(&config_dir).await?;
    fs::create_dir_all(&state_dir).await?;

    Ok(TempDirs {
        _base: base,
        config_dir,
        state_dir,
    })
}
