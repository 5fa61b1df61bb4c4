// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define the polymorphic node contract shared by every tree node kind.
// Author: Lukas Bower

//! The node contract.
//!
//! Trees are built from templates that are shared process-wide. Every walk
//! produces a fresh handle through [`Node::clone_node`]; the handle carries its
//! own path, parent and per-handle caches while sharing the template's
//! configuration (child maps, lookup functions, command builders).

use std::any::Any;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use nopfs_wire::{Qid, QidType, Stat, DMDIR};

use crate::error::{NopError, NopResult};
use crate::path::NodePath;

/// Shared read buffer. Partial reads of one handle slice the same allocation.
pub type Content = Arc<[u8]>;

/// Permission bits for directories.
pub const DIR_PERMS: u32 = 0o555;
/// Permission bits for read-only leaves.
pub const FILE_PERMS: u32 = 0o444;
/// Permission bits for control files.
pub const CTL_PERMS: u32 = 0o666;

/// Owner, group and last modifier reported for every node.
pub const ANONYMOUS: &str = "none";

/// Operations every tree node supports.
pub trait Node: Any + Send + Sync {
    /// Independent handle sharing this node's configuration, with the same
    /// path and parent and empty per-handle caches.
    fn clone_node(&self) -> Box<dyn Node>;

    /// Path from the root to this handle.
    fn path(&self) -> &NodePath;

    /// Assign the handle's path.
    fn set_path(&mut self, path: NodePath);

    /// Handle this one was walked from.
    fn parent(&self) -> Option<Arc<dyn Node>>;

    /// Assign the handle's parent.
    fn set_parent(&mut self, parent: Option<Arc<dyn Node>>);

    /// True for directory kinds.
    fn is_dir(&self) -> bool {
        false
    }

    /// Byte length of the content, 0 when not known yet.
    fn size(&self) -> u64;

    /// Static permission bits.
    fn permissions(&self) -> u32;

    /// Full content of the node. Directories return their encoded listing.
    fn read(&self) -> NopResult<Content>;

    /// Content served to a read at `offset`. Directories rebuild their
    /// listing only at offset 0 and continue the same snapshot past it, so
    /// byte offsets stay stable while other handles mutate the tree.
    fn read_at(&self, _offset: u64) -> NopResult<Content> {
        self.read()
    }

    /// Deliver bytes to the node.
    fn write(&self, _data: &[u8]) -> NopResult<()> {
        Err(NopError::InvalidOperation)
    }

    /// Path-derived identity.
    fn identity(&self) -> u64 {
        self.path().identity()
    }

    /// Cancel outstanding work. Must not block behind an in-flight read.
    fn flush(&self) {}

    /// Release per-handle cached state. Idempotent.
    fn close(&self) {}

    /// Resolve one component, returning a new handle whose parent is `self`.
    fn walk(self: Arc<Self>, _name: &str) -> NopResult<Box<dyn Node>> {
        Err(NopError::NotFound)
    }

    /// Downcasting hook for control handlers that need their concrete parent.
    fn as_any(&self) -> &dyn Any;
}

/// Path and parent slot carried by every handle.
#[derive(Clone, Default)]
pub struct Placement {
    path: NodePath,
    parent: Option<Arc<dyn Node>>,
}

impl Placement {
    /// Placement at `path` without a parent.
    #[must_use]
    pub fn at(path: NodePath) -> Self {
        Self { path, parent: None }
    }

    /// Borrow the path.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Replace the path.
    pub fn set_path(&mut self, path: NodePath) {
        self.path = path;
    }

    /// Clone the parent reference.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<dyn Node>> {
        self.parent.clone()
    }

    /// Replace the parent reference.
    pub fn set_parent(&mut self, parent: Option<Arc<dyn Node>>) {
        self.parent = parent;
    }
}

/// Clone `template` into a handle located at `path`.
#[must_use]
pub fn positioned(template: &dyn Node, path: NodePath) -> Box<dyn Node> {
    let mut handle = template.clone_node();
    handle.set_path(path);
    handle
}

/// Clone `template` into a child handle of `parent` named `name`.
#[must_use]
pub fn descend(template: &dyn Node, parent: Arc<dyn Node>, name: &str) -> Box<dyn Node> {
    let mut handle = positioned(template, parent.path().join(name));
    handle.set_parent(Some(parent));
    handle
}

/// Qid of a node.
#[must_use]
pub fn qid(node: &dyn Node) -> Qid {
    let ty = if node.is_dir() {
        QidType::DIR
    } else {
        QidType::FILE
    };
    Qid::new(ty, 0, node.identity())
}

/// Metadata snapshot of a node. The root is named `/`.
#[must_use]
pub fn stat(node: &dyn Node) -> Stat {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0);
    let (mode, length) = if node.is_dir() {
        (node.permissions() | DMDIR, 0)
    } else {
        (node.permissions(), node.size())
    };
    Stat {
        ty: 0,
        dev: 0,
        qid: qid(node),
        mode,
        atime: now,
        mtime: now,
        length,
        name: node.path().last().unwrap_or("/").to_owned(),
        uid: ANONYMOUS.to_owned(),
        gid: ANONYMOUS.to_owned(),
        muid: ANONYMOUS.to_owned(),
    }
}

/// Append the directory record of `node` to a listing buffer.
pub fn encode_entry(buffer: &mut Vec<u8>, node: &dyn Node) -> NopResult<()> {
    stat(node).encode(buffer)?;
    Ok(())
}
