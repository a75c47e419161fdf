// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tactile Arbiter: the per-frame scheduler that decides which gestures get
//! which pointers, and which gestures preempt one another.
//!
//! The [`Engine`] owns the whole pipeline: the pointer registry
//! (`tactile_pointer`), the scene tree and hit-resolver seam
//! (`tactile_scene`), and an arena of gestures (`tactile_gesture`
//! recognizers plus their cores). Each call to [`Engine::update`] runs one
//! frame:
//!
//! 1. Flush the registry into an ordered batch.
//! 2. Hit-test newly pressed pointers (once each; the result sticks for the
//!    press) and group them by target node.
//! 3. For every target, offer the pointers to the gestures on the target and
//!    its ancestors, innermost first, unless an already-recognizing gesture
//!    in the candidate union prevents them, or a delegate declines them.
//! 4. Redeliver update/release/cancel events to exactly the gestures that
//!    claimed each pointer at press time.
//! 5. Resolve the transitions recognizers request: fail-chain deferrals,
//!    owner vetoes, prevention by already-started gestures (which always win
//!    over gestures attempting to start), and the eager failing of rivals
//!    that were merely sampling.
//! 6. Reset every gesture that reached a terminal state, discard the frame's
//!    hierarchy caches, and advance the exclusivity countdown.
//!
//! Cross-gesture policy is expressed three ways: *friendships*
//! ([`Engine::add_friendship`], symmetric, never prevent each other),
//! *fail-chains* ([`Engine::require_failure_of`], gesture B waits for A to
//! fail), and per-gesture [`GestureDelegate`] overrides.
//!
//! ```rust
//! use kurbo::Point;
//! use tactile_arbiter::Engine;
//! use tactile_gesture::{GestureCore, GestureState, Transform};
//! use tactile_scene::{Hit, HitKind, HitResolver, LayerId, NodeId};
//!
//! // A resolver that lands every pointer on one node.
//! struct WholeScreen(NodeId);
//! impl HitResolver for WholeScreen {
//!     fn resolve(&self, _position: Point) -> Option<Hit> {
//!         Some(Hit {
//!             node: self.0,
//!             layer: LayerId(0),
//!             kind: HitKind::Screen,
//!             distance: 0.0,
//!         })
//!     }
//! }
//!
//! let mut engine = Engine::without_resolver();
//! let root = engine.scene_mut().insert_root();
//! engine.set_resolver(WholeScreen(root));
//! let pan = engine
//!     .add_gesture(root, GestureCore::with_limits(1, 0), Transform::pan())
//!     .unwrap();
//!
//! let input = engine.pointer_handle();
//! let finger = input.add(Point::new(10.0, 10.0));
//! input.press(finger);
//! engine.update(1.0 / 60.0);
//! assert_eq!(engine.state(pan), Some(GestureState::Possible));
//!
//! // A 50 px drag crosses the default motion threshold.
//! input.update(finger, Point::new(60.0, 10.0));
//! engine.update(1.0 / 60.0);
//! assert_eq!(engine.state(pan), Some(GestureState::Began));
//! let delta = engine.recognizer_as::<Transform>(pan).unwrap().translation_delta();
//! assert_eq!(delta.x, 50.0);
//! ```

mod delegate;
mod engine;
mod hierarchy;

pub use delegate::GestureDelegate;
pub use engine::Engine;

/// Identifier for a gesture registered with an [`Engine`].
///
/// A small, copyable handle consisting of a slot index and a generation
/// counter; ids of removed gestures go stale rather than aliasing later
/// registrations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GestureId(pub(crate) u32, pub(crate) u32);

impl GestureId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}
