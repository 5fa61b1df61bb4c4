// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Serve ICMP probe tool output below host/<name>/icmp/.
// Author: Lukas Bower

//! ICMP provider.
//!
//! Probe tools are located on `PATH` once at start-up. Each tool found becomes
//! a [`Cmd`] file running it against the host component of the handle's path;
//! tools that are missing simply leave their files out.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use log::info;
use nopfs_core::{Cmd, Dir, File};

use super::by_host_command;

/// Help text served as `icmp/README.txt`.
pub const README: &str = "
ICMP and similar network probes
===============================

This directory contains tests that use ICMP to measure characteristics
of the host. Chiefly this means ping(1) and traceroute(1) as well as
the more advanced mtr(1).

";

const FPING_ARGS: &[&str] = &["-e", "-r", "0"];
const PING_ARGS: &[&str] = &["-c", "1"];
const TRACE_ARGS: &[&str] = &["-I"];
const MTR_ARGS: &[&str] = &["-w", "-e", "-b", "-r"];
const MTR_TCP_ARGS: &[&str] = &["-w", "-e", "-b", "-r", "-T"];

/// One probe file: the program to run and the arguments preceding the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    file: &'static str,
    program: PathBuf,
    args: &'static [&'static str],
}

impl Probe {
    /// File name the probe is served under.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Process probing `host`.
    #[must_use]
    pub fn command(&self, host: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args).arg(host);
        command
    }
}

/// Probe tools available on this system.
#[derive(Debug, Clone, Default)]
pub struct Toolbox {
    probes: Vec<Probe>,
}

impl Toolbox {
    /// Locate probe tools on `PATH`.
    #[must_use]
    pub fn discover() -> Self {
        Self::resolve(|name| which::which(name).ok())
    }

    /// Locate probe tools with `find`, preferring fping over ping.
    pub fn resolve<F>(find: F) -> Self
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        let mut probes = Vec::new();
        let mut add = |file: &'static str, program: Option<PathBuf>, args: &'static [&'static str]| {
            if let Some(program) = program {
                info!(target: "nopfs", "icmp: {file} uses {}", program.display());
                probes.push(Probe {
                    file,
                    program,
                    args,
                });
            }
        };

        match find("fping") {
            Some(fping) => add("ping", Some(fping), FPING_ARGS),
            None => add("ping", find("ping"), PING_ARGS),
        }
        match find("fping6") {
            Some(fping6) => add("ping6", Some(fping6), FPING_ARGS),
            None => add("ping6", find("ping6"), PING_ARGS),
        }
        add("trace", find("traceroute"), TRACE_ARGS);
        add("trace6", find("traceroute6"), TRACE_ARGS);
        let mtr = find("mtr");
        add("mtr", mtr.clone(), MTR_ARGS);
        add("mtrt", mtr, MTR_TCP_ARGS);
        Self { probes }
    }

    /// Probes found, in discovery order.
    #[must_use]
    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }
}

/// Build the `icmp/` directory template from the tools found.
pub fn directory(toolbox: &Toolbox) -> Arc<Dir> {
    let dir = Dir::new();
    dir.append("README.txt", File::new(README));
    for probe in toolbox.probes() {
        let probe = probe.clone();
        dir.append(
            probe.file(),
            Cmd::new(by_host_command(move |host| probe.command(host))),
        );
    }
    dir
}
