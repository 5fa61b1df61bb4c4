// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Wildcard directory accepting any child name.
// Author: Lukas Bower

//! Wildcard directories.
//!
//! An [`AnyDir`] resolves every name. Statically registered children win;
//! any other name yields a directory built from the shared wildcard template
//! and is remembered in a history set so listings show visited names. The
//! history only grows until it is cleared through [`reset_history`].

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, info};

use crate::ctl::Ctl;
use crate::dir::{listing_at, CachedListing, Dir, DirEntries};
use crate::error::{NopError, NopResult};
use crate::node::{descend, encode_entry, positioned, Content, Node, Placement, DIR_PERMS};
use crate::path::NodePath;
use crate::sync::{read, write};

/// Static children and visited wildcard names, guarded together so listing
/// and reset never race.
#[derive(Default)]
struct Wildcard {
    statics: BTreeMap<String, Arc<dyn Node>>,
    history: BTreeSet<String>,
    generation: u64,
}

/// Directory that accepts any child name.
pub struct AnyDir {
    shared: Arc<RwLock<Wildcard>>,
    entries: Arc<RwLock<DirEntries>>,
    listing: CachedListing,
    place: Placement,
}

impl AnyDir {
    /// Empty wildcard directory template.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::default(),
            entries: Arc::default(),
            listing: Mutex::new(None),
            place: Placement::default(),
        })
    }

    /// Register a listable child that takes precedence over the wildcard.
    pub fn add_static(&self, name: impl Into<String>, node: Arc<dyn Node>) {
        let name = name.into();
        debug!(target: "nopfs", "anydir {}: static {}", self.path(), name);
        let mut shared = write(&self.shared);
        shared.statics.insert(name, node);
        shared.generation += 1;
    }

    /// Add a child to the template every wildcard name resolves to.
    pub fn append(&self, name: impl Into<String>, node: Arc<dyn Node>) {
        let name = name.into();
        debug!(target: "nopfs", "anydir {}: wildcard entry {}", self.path(), name);
        write(&self.entries).insert(name, node);
    }

    /// Wildcard names visited since the last reset.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        read(&self.shared).history.iter().cloned().collect()
    }

    /// Forget every visited wildcard name, returning how many were dropped.
    pub fn clear_history(&self) -> usize {
        let mut shared = write(&self.shared);
        let dropped = shared.history.len();
        shared.history.clear();
        shared.generation += 1;
        dropped
    }

    /// Control file template that clears the history of the directory it is
    /// registered in.
    #[must_use]
    pub fn reset_control() -> Arc<Ctl> {
        Ctl::new(reset_history)
    }
}

/// Control handler clearing the history of the writer's parent [`AnyDir`].
pub fn reset_history(ctl: &Ctl, _data: &[u8]) -> NopResult<Vec<u8>> {
    let parent = ctl.parent().ok_or(NopError::InvalidOperation)?;
    let dir = parent
        .as_any()
        .downcast_ref::<AnyDir>()
        .ok_or(NopError::InvalidOperation)?;
    let dropped = dir.clear_history();
    info!(target: "nopfs", "anydir {}: history reset, {} names dropped", dir.path(), dropped);
    Ok(b"ok".to_vec())
}

impl Node for AnyDir {
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Self {
            shared: Arc::clone(&self.shared),
            entries: Arc::clone(&self.entries),
            listing: Mutex::new(None),
            place: self.place.clone(),
        })
    }

    fn path(&self) -> &NodePath {
        self.place.path()
    }

    fn set_path(&mut self, path: NodePath) {
        self.place.set_path(path);
    }

    fn parent(&self) -> Option<Arc<dyn Node>> {
        self.place.parent()
    }

    fn set_parent(&mut self, parent: Option<Arc<dyn Node>>) {
        self.place.set_parent(parent);
    }

    fn is_dir(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        0
    }

    fn permissions(&self) -> u32 {
        DIR_PERMS
    }

    fn read(&self) -> NopResult<Content> {
        self.read_at(0)
    }

    fn read_at(&self, offset: u64) -> NopResult<Content> {
        let shared = read(&self.shared);
        listing_at(&self.listing, shared.generation, offset, || {
            let mut buffer = Vec::new();
            for (name, template) in &shared.statics {
                let child = positioned(template.as_ref(), self.path().join(name));
                encode_entry(&mut buffer, child.as_ref())?;
            }
            for name in &shared.history {
                if shared.statics.contains_key(name) {
                    continue;
                }
                let visited = Dir::with_entries(Arc::clone(&self.entries), self.path().join(name));
                encode_entry(&mut buffer, &visited)?;
            }
            Ok(Content::from(buffer))
        })
    }

    fn walk(self: Arc<Self>, name: &str) -> NopResult<Box<dyn Node>> {
        let template = {
            let mut shared = write(&self.shared);
            match shared.statics.get(name) {
                Some(template) => Some(Arc::clone(template)),
                None => {
                    if shared.history.insert(name.to_owned()) {
                        shared.generation += 1;
                    }
                    None
                }
            }
        };
        if let Some(template) = template {
            return Ok(descend(template.as_ref(), self, name));
        }
        let mut visited = Dir::with_entries(Arc::clone(&self.entries), self.path().join(name));
        visited.set_parent(Some(self));
        Ok(Box::new(visited))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
