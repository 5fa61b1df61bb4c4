// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the radio counter file server.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Radio counter file server.

use anyhow::{Context, Result};
use clap::Parser;
use nopfs::cli::{init_logging, ServerArgs};
use nopfs::config::UBNTFS_ADDR;
use nopfs::tree::assemble_ubnt;
use nopfs::NopServer;
use nopfs_core::Dir;

#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Radio counter file server", long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
    /// Seconds between aflist polls.
    #[arg(long)]
    interval: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = cli
        .server
        .resolve()
        .context("failed to load configuration")?;
    if let Some(interval) = cli.interval {
        config.aflist.interval_secs = interval;
    }
    init_logging(config.debug);

    let (root, poller) = assemble_ubnt(Dir::new(), &config.aflist)?;
    if let Some(poller) = poller {
        poller.spawn().context("failed to start aflist poller")?;
    }
    let addr = config.listen_addr(UBNTFS_ADDR);
    let server = NopServer::bind(&addr, root, config.effective_msize())?;
    server.serve().context("server stopped")?;
    Ok(())
}
