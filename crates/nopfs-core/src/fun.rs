// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Leaf node memoizing a path-keyed lookup function.
// Author: Lukas Bower

//! Function-backed files.

use std::any::Any;
use std::sync::{Arc, Mutex};

use log::trace;

use crate::error::NopResult;
use crate::node::{Content, Node, Placement, FILE_PERMS};
use crate::path::NodePath;
use crate::sync::lock;

/// Lookup producing the content of a [`Fun`] from the handle's path.
pub type Lookup = dyn Fn(&NodePath) -> NopResult<Vec<u8>> + Send + Sync;

/// File whose content is the memoized result of a lookup.
///
/// The first read runs the lookup; success or failure is then replayed to
/// every later read of the same handle until [`Node::close`].
pub struct Fun {
    lookup: Arc<Lookup>,
    result: Mutex<Option<NopResult<Content>>>,
    place: Placement,
}

impl Fun {
    /// Function file template backed by `lookup`.
    pub fn new<F>(lookup: F) -> Arc<Self>
    where
        F: Fn(&NodePath) -> NopResult<Vec<u8>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            lookup: Arc::new(lookup),
            result: Mutex::new(None),
            place: Placement::default(),
        })
    }
}

impl Node for Fun {
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Self {
            lookup: Arc::clone(&self.lookup),
            result: Mutex::new(None),
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

    fn size(&self) -> u64 {
        match lock(&self.result).as_ref() {
            Some(Ok(content)) => content.len() as u64,
            _ => 0,
        }
    }

    fn permissions(&self) -> u32 {
        FILE_PERMS
    }

    fn read(&self) -> NopResult<Content> {
        let mut result = lock(&self.result);
        if let Some(memo) = result.as_ref() {
            return memo.clone();
        }
        trace!(target: "nopfs", "fun {}: lookup", self.path());
        let outcome = (self.lookup)(self.path()).map(Content::from);
        *result = Some(outcome.clone());
        outcome
    }

    fn close(&self) {
        lock(&self.result).take();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
