// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Fixed directory node with a generation-checked listing cache.
// Author: Lukas Bower

//! Static directories.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use log::debug;

use crate::error::{NopError, NopResult};
use crate::node::{descend, encode_entry, positioned, Content, Node, Placement, DIR_PERMS};
use crate::path::NodePath;
use crate::sync::{lock, read, write};

/// Child templates shared between a directory template and all its handles.
///
/// `generation` advances on every mutation so handles can tell whether their
/// cached listing is still current.
#[derive(Default)]
pub(crate) struct DirEntries {
    children: BTreeMap<String, Arc<dyn Node>>,
    generation: u64,
}

impl DirEntries {
    pub(crate) fn insert(&mut self, name: String, node: Arc<dyn Node>) {
        self.children.insert(name, node);
        self.generation += 1;
    }
}

/// Listing memoized by a handle, tagged with the generation it was built from.
pub(crate) type CachedListing = Mutex<Option<(u64, Content)>>;

/// Serve a listing from `cache`, building it with `build` when a read starts
/// at offset 0 on a stale snapshot. Reads past the start continue whatever
/// snapshot the handle holds.
pub(crate) fn listing_at<F>(
    cache: &CachedListing,
    generation: u64,
    offset: u64,
    build: F,
) -> NopResult<Content>
where
    F: FnOnce() -> NopResult<Content>,
{
    let mut cached = lock(cache);
    if let Some((built, listing)) = cached.as_ref() {
        if offset > 0 || *built == generation {
            return Ok(Arc::clone(listing));
        }
    }
    let listing = build()?;
    *cached = Some((generation, Arc::clone(&listing)));
    Ok(listing)
}

/// Named mapping from child name to child template.
pub struct Dir {
    entries: Arc<RwLock<DirEntries>>,
    listing: CachedListing,
    place: Placement,
}

impl Dir {
    /// Empty directory template.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_entries(Arc::default(), NodePath::root()))
    }

    pub(crate) fn with_entries(entries: Arc<RwLock<DirEntries>>, path: NodePath) -> Self {
        Self {
            entries,
            listing: Mutex::new(None),
            place: Placement::at(path),
        }
    }

    /// Insert or replace a child. Visible to every handle of this directory.
    pub fn append(&self, name: impl Into<String>, node: Arc<dyn Node>) {
        let name = name.into();
        debug!(target: "nopfs", "dir {}: append {}", self.path(), name);
        write(&self.entries).insert(name, node);
    }

    /// Insert or replace several children under one lock, so concurrent
    /// listings see either none or all of them.
    pub fn extend<I>(&self, children: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn Node>)>,
    {
        let mut entries = write(&self.entries);
        for (name, node) in children {
            entries.children.insert(name, node);
        }
        entries.generation += 1;
        debug!(target: "nopfs", "dir {}: refreshed, {} entries", self.path(), entries.children.len());
    }

    /// Names of the children, in listing order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        read(&self.entries).children.keys().cloned().collect()
    }
}

impl Node for Dir {
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Self {
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
        let entries = read(&self.entries);
        listing_at(&self.listing, entries.generation, offset, || {
            let mut buffer = Vec::new();
            for (name, template) in &entries.children {
                let child = positioned(template.as_ref(), self.path().join(name));
                encode_entry(&mut buffer, child.as_ref())?;
            }
            Ok(Content::from(buffer))
        })
    }

    fn walk(self: Arc<Self>, name: &str) -> NopResult<Box<dyn Node>> {
        let template = read(&self.entries)
            .children
            .get(name)
            .cloned()
            .ok_or(NopError::NotFound)?;
        Ok(descend(template.as_ref(), self, name))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
