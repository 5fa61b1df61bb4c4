// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Load nopfs server configuration from TOML with command-line overrides.
// Author: Lukas Bower

//! Server configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nopfs_wire::MAX_MSIZE;
use serde::Deserialize;
use thiserror::Error;

/// Default listen address of the network operations server.
pub const NOPFS_ADDR: &str = ":5640";
/// Default listen address of the radio counter server.
pub const UBNTFS_ADDR: &str = ":5641";
/// Largest msize an operator may configure.
pub const MSIZE_CEILING: u32 = 65536;
/// Smallest msize an operator may configure.
pub const MSIZE_FLOOR: u32 = 256;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Provider toggles for the network operations tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Serve `dns/` under every host.
    pub dns: bool,
    /// Serve `icmp/` under every host.
    pub icmp: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            dns: true,
            icmp: true,
        }
    }
}

/// Radio counter poller settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AflistConfig {
    /// Executable producing the counter report, looked up on `PATH`.
    pub program: String,
    /// Seconds between polls.
    pub interval_secs: u64,
}

impl Default for AflistConfig {
    fn default() -> Self {
        Self {
            program: "aflist".to_owned(),
            interval_secs: 300,
        }
    }
}

impl AflistConfig {
    /// Poll interval, never shorter than one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Top-level configuration shared by the server binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address. `:port` binds every interface.
    pub addr: Option<String>,
    /// Largest message size offered to clients.
    pub msize: u32,
    /// Log verbosity: 0 info, 1 debug, 2 and above trace.
    pub debug: u8,
    /// Provider toggles.
    pub providers: ProviderConfig,
    /// Radio counter poller.
    pub aflist: AflistConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: None,
            msize: MAX_MSIZE,
            debug: 0,
            providers: ProviderConfig::default(),
            aflist: AflistConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Address to bind, falling back to `default` when none is configured.
    #[must_use]
    pub fn listen_addr(&self, default: &str) -> String {
        normalize_addr(self.addr.as_deref().unwrap_or(default))
    }

    /// Configured msize clamped to the supported range.
    #[must_use]
    pub fn effective_msize(&self) -> u32 {
        self.msize.clamp(MSIZE_FLOOR, MSIZE_CEILING)
    }
}

/// Expand the `:port` shorthand to an all-interfaces socket address.
#[must_use]
pub fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_owned()
    }
}
