// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shared adapters for providers serving per-host subtrees.
// Author: Lukas Bower

//! Content providers mounted into the served trees.
//!
//! Host providers live below `host/<name>/`; the adapters here pull `<name>`
//! out of a handle's path so each provider only deals in host names.

pub mod aflist;
pub mod dns;
pub mod icmp;

use std::process::Command;

use nopfs_core::{NodePath, NopError, NopResult};

/// Index of the host component in paths below `host/`.
pub const HOST_COMPONENT: usize = 1;

/// Host name a handle below `host/<name>/` was reached through.
pub fn host_of(path: &NodePath) -> NopResult<&str> {
    path.get(HOST_COMPONENT).ok_or(NopError::NotFound)
}

/// Adapt a host-keyed lookup into a path-keyed one for [`nopfs_core::Fun`].
pub fn by_host_lookup<F>(lookup: F) -> impl Fn(&NodePath) -> NopResult<Vec<u8>> + Send + Sync + 'static
where
    F: Fn(&str) -> NopResult<Vec<u8>> + Send + Sync + 'static,
{
    move |path| lookup(host_of(path)?)
}

/// Adapt a host-keyed command builder into a path-keyed one for
/// [`nopfs_core::Cmd`]. A path without a host yields an empty argument, which
/// the probe tools reject.
pub fn by_host_command<F>(build: F) -> impl Fn(&NodePath) -> Command + Send + Sync + 'static
where
    F: Fn(&str) -> Command + Send + Sync + 'static,
{
    move |path| build(host_of(path).unwrap_or(""))
}
