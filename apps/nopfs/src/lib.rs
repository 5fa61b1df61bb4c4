// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expose the nopfs servers, providers and configuration.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Network operations file servers.
//!
//! `nopfs` serves per-host probe and resolution files; `ubntfs` serves radio
//! counters. Both assemble a tree with [`tree`], then hand it to
//! [`server::NopServer`].

pub mod cli;
pub mod config;
pub mod providers;
pub mod server;
pub mod tree;

pub use config::{ConfigError, ServerConfig};
pub use server::{NopServer, ServerError, ServerHandle};
