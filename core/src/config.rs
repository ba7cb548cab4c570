// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use davsync_webdav::DavConfig;
use tokio::fs;

use crate::error::ConfigError;
use crate::record::NewCollection;
use crate::scheduler::BackoffPolicy;
use crate::types::{Account, Authority, ResourceKind};

/// The name of the application.
pub const APP_NAME: &str = "davsync";

/// Environment variable holding the path of the config file.
pub const CONFIG_ENV: &str = "DAVSYNC_CONFIG";

/// Configuration of davsync.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Directory holding the local database.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SchedulerConfig {
    /// Delay before the first retry of a failed task, doubled per failure.
    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: u64,

    /// Interval of the periodic sync; no periodic sync if unset.
    #[serde(default)]
    pub periodic_interval_secs: Option<u64>,

    /// Only run periodic syncs on unmetered networks.
    #[serde(default)]
    pub wifi_only: bool,

    /// Whether task lists are synchronized.
    #[serde(default = "default_true")]
    pub tasks_available: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_backoff_secs: default_base_backoff_secs(),
            periodic_interval_secs: None,
            wifi_only: false,
            tasks_available: true,
        }
    }
}

impl SchedulerConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::exponential(Duration::from_secs(self.base_backoff_secs))
    }

    pub fn periodic_interval(&self) -> Option<Duration> {
        self.periodic_interval_secs.map(Duration::from_secs)
    }
}

const fn default_base_backoff_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

/// A server account and the collections bound to it.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AccountConfig {
    pub name: String,

    #[serde(default = "default_account_kind")]
    pub kind: String,

    pub server: DavConfig,

    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

fn default_account_kind() -> String {
    APP_NAME.to_string()
}

impl AccountConfig {
    pub fn account(&self) -> Account {
        Account {
            name: self.name.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Collection bindings to register in the local store.
    pub fn new_collections(&self) -> Vec<NewCollection> {
        self.collections
            .iter()
            .map(|c| NewCollection {
                account: self.account(),
                authority: c.authority,
                kind: c.kind.unwrap_or_else(|| c.authority.default_kind()),
                url: c.url.clone(),
                sync_enabled: c.sync,
            })
            .collect()
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CollectionConfig {
    /// Location of the collection on the server.
    pub url: String,

    pub authority: Authority,

    /// Defaults to the kind the authority holds.
    #[serde(default)]
    pub kind: Option<ResourceKind>,

    #[serde(default = "default_true")]
    pub sync: bool,
}

impl Config {
    /// Loads the config file from `path`, `$DAVSYNC_CONFIG` or the user
    /// config directory, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if no config file is found or it cannot be read.
    #[tracing::instrument]
    pub async fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => match std::env::var(CONFIG_ENV) {
                Ok(env_path) => PathBuf::from(env_path),
                Err(_) => {
                    let path = get_config_dir()?.join(APP_NAME).join("config.toml");
                    if !path.exists() {
                        return Err(ConfigError::Invalid(format!(
                            "no config found at {}",
                            path.display()
                        )));
                    }
                    path
                }
            },
        };

        let text = fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        let mut config = Self::parse(&path, &text)?;
        config.normalize()?;
        Ok(config)
    }

    /// Parses a config file without normalizing it.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a valid config.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Expands paths, fills in defaults and checks the accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be expanded or an account is
    /// configured twice.
    pub fn normalize(&mut self) -> Result<(), ConfigError> {
        match &self.state_dir {
            Some(dir) => self.state_dir = Some(expand_path(dir)?),
            None => match get_state_dir() {
                Ok(dir) => self.state_dir = Some(dir.join(APP_NAME)),
                Err(err) => tracing::warn!(%err, "failed to get state directory"),
            },
        }

        if self.scheduler.base_backoff_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.base_backoff_secs must be positive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.account()) {
                return Err(ConfigError::Invalid(format!(
                    "account {} is configured twice",
                    account.account()
                )));
            }
            if let Some(c) = account.collections.iter().find(|c| c.url.is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "collection of {} account {} has an empty url",
                    c.authority,
                    account.account()
                )));
            }
        }
        Ok(())
    }

    /// Path of the local database, if a state directory is known.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.state_dir
            .as_ref()
            .map(|dir| dir.join(format!("{APP_NAME}.db")))
    }

    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.name == name)
    }
}

/// Handle tilde (~) and environment variables in the path
fn expand_path(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let path = path
        .to_str()
        .ok_or_else(|| ConfigError::Invalid(format!("invalid path: {}", path.display())))?;

    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    let state_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_STATE_HOME/", "${XDG_STATE_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in state_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_state_dir()?.join(stripped));
        }
    }

    Ok(path.into())
}

fn get_home_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .ok_or_else(|| ConfigError::Invalid("user-specific home directory not found".to_string()))
}

fn get_config_dir() -> Result<PathBuf, ConfigError> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir
        .ok_or_else(|| ConfigError::Invalid("user-specific config directory not found".to_string()))
}

fn get_state_dir() -> Result<PathBuf, ConfigError> {
    #[cfg(unix)]
    let state_dir = xdg::BaseDirectories::new().get_state_home();
    #[cfg(windows)]
    let state_dir = dirs::data_dir();
    state_dir
        .ok_or_else(|| ConfigError::Invalid("user-specific state directory not found".to_string()))
}
