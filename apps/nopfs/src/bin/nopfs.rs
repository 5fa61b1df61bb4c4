// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the network operations file server.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Network operations file server.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use nopfs::cli::{init_logging, ServerArgs};
use nopfs::config::NOPFS_ADDR;
use nopfs::tree::{assemble, HostProviders};
use nopfs::NopServer;
use nopfs_core::Dir;

#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Network operations file server", long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli
        .server
        .resolve()
        .context("failed to load configuration")?;
    init_logging(config.debug);

    let providers = HostProviders::discover(&config.providers);
    let root = assemble(Dir::new(), providers);
    info!(target: "nopfs", "nopfs root: {}", root.names().join(" "));
    let addr = config.listen_addr(NOPFS_ADDR);
    let server = NopServer::bind(&addr, root, config.effective_msize())?;
    server.serve().context("server stopped")?;
    Ok(())
}
