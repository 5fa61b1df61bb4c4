// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Track per-connection fid bindings and in-flight request tags.
// Author: Lukas Bower

//! Session tracking primitives: fid bindings and in-flight tags.

use std::collections::BTreeMap;

/// Fid table keyed by client fid.
#[derive(Debug)]
pub struct FidTable<T> {
    entries: BTreeMap<u32, T>,
}

impl<T> FidTable<T> {
    /// Create an empty fid table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Return true if the fid is bound.
    #[must_use]
    pub fn contains(&self, fid: u32) -> bool {
        self.entries.contains_key(&fid)
    }

    /// Bind a fid, returning the previous binding.
    pub fn insert(&mut self, fid: u32, value: T) -> Option<T> {
        self.entries.insert(fid, value)
    }

    /// Borrow a binding.
    #[must_use]
    pub fn get(&self, fid: u32) -> Option<&T> {
        self.entries.get(&fid)
    }

    /// Unbind a fid.
    pub fn remove(&mut self, fid: u32) -> Option<T> {
        self.entries.remove(&fid)
    }

    /// Unbind every fid, returning the bindings in fid order.
    pub fn drain(&mut self) -> Vec<(u32, T)> {
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    /// Number of bound fids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no fid is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for FidTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised when registering an in-flight tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    /// The tag is already attached to an outstanding request.
    #[error("tag {0} already in use")]
    InUse(u16),
}

/// Outstanding requests keyed by tag, remembering the fid each one targets so
/// a flush can reach the right node.
#[derive(Debug, Default)]
pub struct InFlight {
    tags: BTreeMap<u16, Option<u32>>,
}

impl InFlight {
    /// Register an outstanding request.
    pub fn begin(&mut self, tag: u16, fid: Option<u32>) -> Result<(), TagError> {
        if self.tags.contains_key(&tag) {
            return Err(TagError::InUse(tag));
        }
        self.tags.insert(tag, fid);
        Ok(())
    }

    /// Mark a request as answered.
    pub fn finish(&mut self, tag: u16) -> bool {
        self.tags.remove(&tag).is_some()
    }

    /// Return true while the request is outstanding.
    #[must_use]
    pub fn is_pending(&self, tag: u16) -> bool {
        self.tags.contains_key(&tag)
    }

    /// Fid targeted by an outstanding request.
    #[must_use]
    pub fn fid_of(&self, tag: u16) -> Option<u32> {
        self.tags.get(&tag).copied().flatten()
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True when nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
