// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Assemble the trees served by the nopfs and ubntfs binaries.
// Author: Lukas Bower

//! Tree assembly.
//!
//! Providers are discovered first, then grafted onto an empty root. Nothing
//! is registered implicitly; the binaries call these functions once before
//! accepting connections.

use std::sync::Arc;

use log::{info, warn};
use nopfs_core::{AnyDir, Dir, File};

use crate::config::{AflistConfig, ProviderConfig};
use crate::providers::aflist::{AflistError, AflistPoller};
use crate::providers::dns::{self, HickoryService};
use crate::providers::icmp::{self, Toolbox};

/// Help text served as `README.txt` at the root.
pub const ROOT_README: &str = "
Network Operations File System
==============================

This directory tree exposes live information about the network through
the filesystem. It can be navigated and manipulated using all of the
usual tools for working with files.

  host/    information about specific hosts

";

/// Help text served as `host/README.txt`.
pub const HOST_README: &str = "
Host operations
===============

Operations that may be done on a hostname or IP address.

  h/icmp/    ping, traceroute, etc.
  h/dns/     gathering information from domain name system.

It suffices to change into the subdirectory named for the host or IP
address. These subdirectories will not appear in a listing but can
nevertheless be descended into, for example,

  % cat 127.0.0.1/icmp/ping
  127.0.0.1 is alive (0.02 ms)

This filesystem caches recently accessed hosts, and they will appear
as directories. There is a control interface for clearing the cache,
which consists of doing a write operation on the 'clear' file, as in,

  % echo > clear

";

/// Per-host provider directories to mount below `host/<name>/`.
#[derive(Default)]
pub struct HostProviders {
    /// `icmp/` directory template.
    pub icmp: Option<Arc<Dir>>,
    /// `dns/` directory template.
    pub dns: Option<Arc<Dir>>,
}

impl HostProviders {
    /// Build the enabled providers against the local system.
    #[must_use]
    pub fn discover(config: &ProviderConfig) -> Self {
        let icmp = config
            .icmp
            .then(|| icmp::directory(&Toolbox::discover()));
        let dns = if config.dns {
            match HickoryService::from_system() {
                Ok(service) => Some(dns::directory(Arc::new(service))),
                Err(err) => {
                    warn!(target: "nopfs", "dns: resolver unavailable, omitting dns/: {err}");
                    None
                }
            }
        } else {
            None
        };
        Self { icmp, dns }
    }
}

/// Graft the network operations tree onto `root`.
pub fn assemble(root: Arc<Dir>, providers: HostProviders) -> Arc<Dir> {
    root.append("README.txt", File::new(ROOT_README));

    let host = AnyDir::new();
    host.add_static("README.txt", File::new(HOST_README));
    host.add_static("clear", AnyDir::reset_control());
    if let Some(icmp) = providers.icmp {
        host.append("icmp", icmp);
    }
    if let Some(dns) = providers.dns {
        host.append("dns", dns);
    }
    root.append("host", host);
    root
}

/// Graft the radio counter tree onto `root`.
///
/// Returns the poller to start when the report tool is installed; without it
/// the root stays empty.
pub fn assemble_ubnt(
    root: Arc<Dir>,
    config: &AflistConfig,
) -> Result<(Arc<Dir>, Option<AflistPoller>), AflistError> {
    let program = match which::which(&config.program) {
        Ok(program) => program,
        Err(err) => {
            info!(target: "nopfs", "aflist: {} not found, omitting aflist/: {err}", config.program);
            return Ok((root, None));
        }
    };
    let poller = AflistPoller::new(program, config.interval())?;
    root.append("aflist", poller.directory());
    Ok((root, Some(poller)))
}
