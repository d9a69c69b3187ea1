// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo configuration
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! command-line overrides applied by the binary.

use serde::{Deserialize, Serialize};
use sp_core::LockServiceConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that replaces the platform config directory
pub const CONFIG_DIR_ENV: &str = "SANDPIPER_CONFIG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("clients must be at least 1")]
    NoClients,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Broker the demo would connect to; the in-memory bus only logs it
    pub bus_address: String,
    /// Address of the value store
    pub service_address: String,
    /// Lock guarding the stored value
    pub lock_name: String,
    /// Address of the lock service
    pub lock_service_address: String,
    /// Number of competing increment clients
    pub clients: usize,
    pub locks: LockServiceConfig,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            bus_address: "127.0.0.1:5672".to_string(),
            service_address: "counterValue".to_string(),
            lock_name: "mutex.counterValue".to_string(),
            lock_service_address: "sandpiper.locks".to_string(),
            clients: 3,
            locks: LockServiceConfig::default(),
        }
    }
}

impl DemoConfig {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, which must exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml(path, &text)
    }

    /// Load the explicit path if given, else the default file if it exists,
    /// else the built-in defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clients == 0 {
            return Err(ConfigError::NoClients);
        }
        Ok(())
    }
}

/// `<config dir>/sandpiper/demo.toml`
pub fn default_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir).join("demo.toml"));
    }
    dirs::config_dir().map(|dir| dir.join("sandpiper").join("demo.toml"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
