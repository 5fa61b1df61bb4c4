// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Track node paths and derive path-scoped identities.
// Author: Lukas Bower

//! Node paths and the identity derived from them.

use std::fmt;

use sha2::{Digest, Sha256};

/// Ordered component list from the tree root to a node. The root is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// Path of the tree root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from its components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(components.into_iter().map(Into::into).collect())
    }

    /// Return a new path extended by `name`.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let mut components = Vec::with_capacity(self.0.len() + 1);
        components.extend(self.0.iter().cloned());
        components.push(name.to_owned());
        Self(components)
    }

    /// Borrow the components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Component at `index`, counting from the root.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Final component, `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity of the node living at this path.
    #[must_use]
    pub fn identity(&self) -> u64 {
        identity(&self.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

/// SHA-256 over the `/`-joined components, truncated to the first eight
/// digest bytes read little-endian.
#[must_use]
pub fn identity(components: &[String]) -> u64 {
    let digest = Sha256::digest(components.join("/").as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}
