// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command-line options and logging setup shared by the server binaries.
// Author: Lukas Bower

//! Shared command-line handling.

use std::path::PathBuf;

use clap::Args;
use env_logger::Env;
use log::LevelFilter;

use crate::config::{ConfigError, ServerConfig};

/// Options accepted by every server binary.
#[derive(Debug, Clone, Default, Args)]
pub struct ServerArgs {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Network address to listen on, e.g. `:5640` or `127.0.0.1:5640`.
    #[arg(long)]
    pub addr: Option<String>,
    /// Debug level: 1 logs requests, 2 and above traces frames.
    #[arg(long)]
    pub debug: Option<u8>,
    /// Largest message size offered to clients.
    #[arg(long)]
    pub msize: Option<u32>,
}

impl ServerArgs {
    /// Configuration file contents, or defaults, with flags applied on top.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(addr) = &self.addr {
            config.addr = Some(addr.clone());
        }
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(msize) = self.msize {
            config.msize = msize;
        }
        Ok(config)
    }
}

/// Log filter for a debug level.
#[must_use]
pub fn level_for(debug: u8) -> LevelFilter {
    match debug {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the process logger. `RUST_LOG` overrides the debug level.
pub fn init_logging(debug: u8) {
    let default_level = level_for(debug);
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}
