// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame memoization of hierarchy candidate lists.
//!
//! Arbitration repeatedly asks two questions about a target node: which
//! gestures sit on the node and its ancestors (the ones eligible to claim
//! pointers hit there), and which sit on the node and its descendants (the
//! ones that may already have started and can prevent). The scene tree may
//! be mutated between frames, so the memo lives for exactly one frame and is
//! discarded with it.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tactile_scene::{NodeId, SceneTree};

use crate::GestureId;

/// Gestures attached to each node, maintained by the engine.
pub(crate) type NodeGestures = HashMap<NodeId, SmallVec<[GestureId; 2]>>;

/// One frame's memo of candidate lists per target node.
#[derive(Debug, Default)]
pub(crate) struct HierarchyCache {
    ending_with: HashMap<NodeId, SmallVec<[GestureId; 8]>>,
    beginning_with: HashMap<NodeId, SmallVec<[GestureId; 8]>>,
}

impl HierarchyCache {
    /// Gestures on `target` and its ancestors, innermost first.
    pub(crate) fn ending_with(
        &mut self,
        scene: &SceneTree,
        on_node: &NodeGestures,
        target: NodeId,
    ) -> SmallVec<[GestureId; 8]> {
        if let Some(cached) = self.ending_with.get(&target) {
            return cached.clone();
        }
        let mut list = SmallVec::new();
        for node in scene.ancestors(target) {
            if let Some(gestures) = on_node.get(&node) {
                list.extend(gestures.iter().copied());
            }
        }
        self.ending_with.insert(target, list.clone());
        list
    }

    /// Gestures on `target` and its descendants, depth-first from the target.
    pub(crate) fn beginning_with(
        &mut self,
        scene: &SceneTree,
        on_node: &NodeGestures,
        target: NodeId,
    ) -> SmallVec<[GestureId; 8]> {
        if let Some(cached) = self.beginning_with.get(&target) {
            return cached.clone();
        }
        let mut list = SmallVec::new();
        for node in scene.descendants(target) {
            if let Some(gestures) = on_node.get(&node) {
                list.extend(gestures.iter().copied());
            }
        }
        self.beginning_with.insert(target, list.clone());
        list
    }

    /// The candidate union for a begin/prevention scan: ancestors first, then
    /// any descendants not already present.
    pub(crate) fn candidate_union(
        &mut self,
        scene: &SceneTree,
        on_node: &NodeGestures,
        target: NodeId,
    ) -> SmallVec<[GestureId; 8]> {
        let mut union = self.ending_with(scene, on_node, target);
        for g in self.beginning_with(scene, on_node, target) {
            if !union.contains(&g) {
                union.push(g);
            }
        }
        union
    }
}
