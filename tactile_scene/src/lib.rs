// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tactile Scene: the node hierarchy that gesture arbitration runs over.
//!
//! This crate provides the three collaborators the arbitration engine needs
//! from "the scene" without depending on any particular renderer or layout
//! system:
//!
//! - [`SceneTree`]: an arena of nodes with parent pointers and child index
//!   lists, supporting ancestor and descendant traversal. Gesture recognizers
//!   are attached to these nodes by higher layers; this crate only models the
//!   hierarchy itself.
//! - [`HitResolver`]: the external hit-test oracle. Given a screen position it
//!   returns the topmost [`Hit`] (target node, layer, projection kind,
//!   distance). Arbitration calls it once per pointer at press time and caches
//!   the result for the life of that press.
//! - [`Exclusivity`]: a capability that lets one subsystem temporarily
//!   monopolize all pointers against a subtree. Release is deliberately
//!   delayed by two full frames so consumers mid-dispatch never observe it
//!   vanishing.
//!
//! ## Hierarchy queries
//!
//! ```rust
//! use tactile_scene::SceneTree;
//!
//! let mut tree = SceneTree::new();
//! let root = tree.insert_root();
//! let panel = tree.insert(root).unwrap();
//! let button = tree.insert(panel).unwrap();
//!
//! // Ancestors walk from the node to the root, inclusive.
//! let up: Vec<_> = tree.ancestors(button).collect();
//! assert_eq!(up, vec![button, panel, root]);
//!
//! // Descendants walk the subtree depth-first, inclusive.
//! let down: Vec<_> = tree.descendants(panel).collect();
//! assert_eq!(down, vec![panel, button]);
//! ```
//!
//! ## Exclusivity timing
//!
//! ```rust
//! use tactile_scene::{Exclusivity, SceneTree};
//!
//! let mut tree = SceneTree::new();
//! let root = tree.insert_root();
//! let child = tree.insert(root).unwrap();
//!
//! let mut exclusive = Exclusivity::new();
//! exclusive.set_exclusive(&tree, root);
//! assert!(exclusive.is_exclusive(child));
//!
//! exclusive.request_release();
//! // Still exclusive for the next two frame ticks.
//! exclusive.tick();
//! assert!(exclusive.is_exclusive(child));
//! exclusive.tick();
//! assert!(!exclusive.is_exclusive(child));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod exclusive;
mod hit;
mod tree;

pub use exclusive::Exclusivity;
pub use hit::{Hit, HitKind, HitResolver, LayerId};
pub use tree::{Ancestors, Descendants, SceneTree, StaleNode};

/// Identifier for a node in the scene tree.
///
/// A small, copyable handle consisting of a slot index and a generation
/// counter. It stays stable across unrelated updates but becomes invalid when
/// the underlying slot is reused; stale `NodeId`s never alias a different
/// live node because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}
