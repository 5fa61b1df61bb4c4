// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Immutable byte-buffer leaf node.
// Author: Lukas Bower

//! Static files.

use std::any::Any;
use std::sync::Arc;

use crate::error::NopResult;
use crate::node::{Content, Node, Placement, FILE_PERMS};
use crate::path::NodePath;

/// Immutable byte buffer.
#[derive(Clone)]
pub struct File {
    data: Content,
    place: Placement,
}

impl File {
    /// Wrap `data` in a file template.
    pub fn new(data: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            data: Content::from(data.into()),
            place: Placement::default(),
        })
    }
}

impl Node for File {
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(self.clone())
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
        self.data.len() as u64
    }

    fn permissions(&self) -> u32 {
        FILE_PERMS
    }

    fn read(&self) -> NopResult<Content> {
        Ok(Arc::clone(&self.data))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
