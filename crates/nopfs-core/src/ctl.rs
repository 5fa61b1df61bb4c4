// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Write-triggered control file node.
// Author: Lukas Bower

//! Control files.
//!
//! A write hands the payload to the registered handler; the handler's reply
//! becomes the readable content of the handle until the next write.

use std::any::Any;
use std::sync::{Arc, RwLock};

use log::debug;

use crate::error::{NopError, NopResult};
use crate::node::{Content, Node, Placement, CTL_PERMS};
use crate::path::NodePath;
use crate::sync::{read, write};

/// Control handler. Receives the handle being written and the payload.
pub type CtlHandler = dyn Fn(&Ctl, &[u8]) -> NopResult<Vec<u8>> + Send + Sync;

/// Write-triggered control channel.
pub struct Ctl {
    handler: Arc<CtlHandler>,
    reply: RwLock<Option<Content>>,
    place: Placement,
}

impl Ctl {
    /// Control file template backed by `handler`.
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Ctl, &[u8]) -> NopResult<Vec<u8>> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Arc::new(handler),
            reply: RwLock::new(None),
            place: Placement::default(),
        })
    }
}

impl Node for Ctl {
    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(Self {
            handler: Arc::clone(&self.handler),
            reply: RwLock::new(None),
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
        read(&self.reply)
            .as_ref()
            .map_or(0, |reply| reply.len() as u64)
    }

    fn permissions(&self) -> u32 {
        CTL_PERMS
    }

    fn read(&self) -> NopResult<Content> {
        read(&self.reply).clone().ok_or(NopError::NotFound)
    }

    fn write(&self, data: &[u8]) -> NopResult<()> {
        debug!(target: "nopfs", "ctl {}: write {} bytes", self.path(), data.len());
        let outcome = (self.handler)(self, data);
        let mut reply = write(&self.reply);
        match outcome {
            Ok(bytes) => {
                *reply = Some(Content::from(bytes));
                Ok(())
            }
            Err(err) => {
                *reply = None;
                Err(err)
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
