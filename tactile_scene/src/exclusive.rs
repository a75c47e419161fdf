// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subtree exclusivity with delayed release.
//!
//! One subsystem at a time may monopolize pointer input against a subtree
//! (a modal overlay grabbing everything under it, for example). The captured
//! set is an owned snapshot of node ids taken at request time; later tree
//! mutations do not grow or shrink it.
//!
//! Release is never immediate. [`Exclusivity::request_release`] arms a
//! two-frame countdown that [`Exclusivity::tick`] (called once per frame, at
//! frame end) counts down; the set clears only when it reaches zero. Layers
//! that were mid-dispatch when the release was requested therefore still see
//! a consistent answer from [`Exclusivity::is_exclusive`] for the remainder
//! of that frame and the next.

use hashbrown::HashSet;

use crate::{NodeId, SceneTree};

/// Frames between a release request and the set actually clearing.
const RELEASE_DELAY_FRAMES: u8 = 2;

/// Tracks which subtree, if any, currently monopolizes pointer input.
#[derive(Debug, Default)]
pub struct Exclusivity {
    nodes: HashSet<NodeId>,
    countdown: Option<u8>,
}

impl Exclusivity {
    /// Creates an inactive exclusivity tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while any subtree holds exclusivity.
    ///
    /// Remains `true` during the release countdown.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.nodes.is_empty()
    }

    /// Returns `true` if `node` belongs to the exclusive set.
    #[must_use]
    pub fn is_exclusive(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Captures `root` and all of its descendants as the exclusive set.
    ///
    /// Replaces any previous capture and cancels a pending release.
    pub fn set_exclusive(&mut self, tree: &SceneTree, root: NodeId) {
        self.nodes.clear();
        self.nodes.extend(tree.descendants(root));
        self.countdown = None;
    }

    /// Arms the delayed release of the current capture.
    ///
    /// The set stays queryable until [`tick`](Self::tick) has run
    /// `RELEASE_DELAY_FRAMES` times. Requesting release with no active
    /// capture is a no-op.
    pub fn request_release(&mut self) {
        if self.is_active() {
            self.countdown = Some(RELEASE_DELAY_FRAMES);
        }
    }

    /// Advances the release countdown by one frame.
    ///
    /// Call once per frame after all dispatch for that frame has finished.
    pub fn tick(&mut self) {
        if let Some(remaining) = self.countdown {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                self.nodes.clear();
                self.countdown = None;
            } else {
                self.countdown = Some(remaining);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> (SceneTree, NodeId, NodeId, NodeId) {
        let mut tree = SceneTree::new();
        let root = tree.insert_root();
        let inner = tree.insert(root).unwrap();
        let outside = tree.insert_root();
        (tree, root, inner, outside)
    }

    #[test]
    fn captures_subtree_snapshot() {
        let (tree, root, inner, outside) = small_tree();
        let mut ex = Exclusivity::new();

        ex.set_exclusive(&tree, root);
        assert!(ex.is_active());
        assert!(ex.is_exclusive(root));
        assert!(ex.is_exclusive(inner));
        assert!(!ex.is_exclusive(outside));
    }

    #[test]
    fn snapshot_ignores_later_tree_growth() {
        let (mut tree, root, _inner, _outside) = small_tree();
        let mut ex = Exclusivity::new();
        ex.set_exclusive(&tree, root);

        let late = tree.insert(root).unwrap();
        assert!(!ex.is_exclusive(late));
    }

    #[test]
    fn release_is_delayed_two_full_frames() {
        let (tree, root, inner, _outside) = small_tree();
        let mut ex = Exclusivity::new();
        ex.set_exclusive(&tree, root);

        ex.request_release();
        assert!(ex.is_exclusive(inner));
        ex.tick();
        assert!(ex.is_exclusive(inner));
        ex.tick();
        assert!(!ex.is_exclusive(inner));
        assert!(!ex.is_active());
    }

    #[test]
    fn recapture_cancels_pending_release() {
        let (tree, root, inner, _outside) = small_tree();
        let mut ex = Exclusivity::new();
        ex.set_exclusive(&tree, root);
        ex.request_release();
        ex.tick();

        ex.set_exclusive(&tree, root);
        ex.tick();
        ex.tick();
        // The new capture armed no release, so ticks change nothing.
        assert!(ex.is_exclusive(inner));
    }

    #[test]
    fn release_without_capture_is_noop() {
        let mut ex = Exclusivity::new();
        ex.request_release();
        ex.tick();
        assert!(!ex.is_active());
    }
}
