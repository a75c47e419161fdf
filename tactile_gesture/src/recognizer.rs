// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recognizer interface the arbitration engine drives.

use std::any::Any;

use kurbo::Point;
use tactile_pointer::{PointerId, PointerRegistry};

use crate::core::GestureCore;
use crate::state::GestureState;

/// Read access to the positions of live pointers.
///
/// Recognizers receive this instead of the pointer registry itself so they
/// can be exercised against any pointer store (including plain maps in
/// tests).
pub trait PointerLookup {
    /// Current position of a live pointer.
    fn position(&self, id: PointerId) -> Option<Point>;

    /// Position the pointer had at the start of the frame.
    fn previous_position(&self, id: PointerId) -> Option<Point>;
}

impl<H> PointerLookup for PointerRegistry<H> {
    fn position(&self, id: PointerId) -> Option<Point> {
        self.get(id).map(|p| p.position())
    }

    fn previous_position(&self, id: PointerId) -> Option<Point> {
        self.get(id).map(|p| p.previous_position())
    }
}

/// Everything a recognizer can see while handling one dispatch.
#[derive(Clone, Copy)]
pub struct RecognizerCx<'a> {
    /// The gesture's bookkeeping, already updated for this dispatch (claimed
    /// pointers added or removed, count classification recomputed).
    pub core: &'a GestureCore,
    /// Position access for the gesture's active pointers.
    pub pointers: &'a dyn PointerLookup,
    /// The pointer ids this dispatch is about (pressed, moved, released, or
    /// cancelled, depending on the entry point called).
    pub changed: &'a [PointerId],
}

impl core::fmt::Debug for RecognizerCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecognizerCx")
            .field("core", &self.core)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

/// One recognition pattern: tap, long-press, transform, and so on.
///
/// The arbitration engine delivers pointer batches through the four
/// `pointers_*` entry points and ticks [`update`](Self::update) once per
/// frame. Entry points return the transition the recognizer *requests*; the
/// engine resolves the request against the conflict rules and commits the
/// authoritative state to the [`GestureCore`]; a recognizer never observes
/// its own request directly, only the state the engine settled on.
///
/// Implementations must not keep pointer positions across epochs;
/// [`reset`](Self::reset) is called whenever the gesture returns to idle.
pub trait Recognizer: Any {
    /// Pointers newly claimed by this gesture went down.
    fn pointers_pressed(&mut self, _cx: RecognizerCx<'_>) -> Option<GestureState> {
        None
    }

    /// Claimed pointers moved.
    fn pointers_updated(&mut self, _cx: RecognizerCx<'_>) -> Option<GestureState> {
        None
    }

    /// Claimed pointers went up (already removed from the core).
    fn pointers_released(&mut self, _cx: RecognizerCx<'_>) -> Option<GestureState> {
        None
    }

    /// Claimed pointers were cancelled (already removed from the core).
    fn pointers_cancelled(&mut self, _cx: RecognizerCx<'_>) -> Option<GestureState> {
        None
    }

    /// Per-frame time tick for duration-based recognizers.
    ///
    /// `dt` is the frame duration in seconds. There is no timeout mechanism
    /// in the engine; recognizers measure elapsed time themselves and
    /// request their own transitions.
    fn update(&mut self, _core: &GestureCore, _dt: f64) -> Option<GestureState> {
        None
    }

    /// Clears recognizer-local state for the next recognition epoch.
    fn reset(&mut self) {}

    /// Upcast for consumers that need the concrete recognizer (delta
    /// accessors on continuous gestures, for example).
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;

    /// A fixed pointer store for recognizer unit tests.
    #[derive(Debug, Default)]
    pub(crate) struct MapLookup {
        pub(crate) positions: HashMap<PointerId, (Point, Point)>,
    }

    impl MapLookup {
        pub(crate) fn set(&mut self, id: PointerId, previous: Point, current: Point) {
            self.positions.insert(id, (previous, current));
        }

        /// Advances `id` to `current`, making the old current the previous.
        pub(crate) fn advance(&mut self, id: PointerId, current: Point) {
            let previous = self.positions.get(&id).map_or(current, |&(_, cur)| cur);
            self.positions.insert(id, (previous, current));
        }
    }

    impl PointerLookup for MapLookup {
        fn position(&self, id: PointerId) -> Option<Point> {
            self.positions.get(&id).map(|&(_, cur)| cur)
        }

        fn previous_position(&self, id: PointerId) -> Option<Point> {
            self.positions.get(&id).map(|&(prev, _)| prev)
        }
    }

    pub(crate) fn mint_ids(n: usize) -> Vec<PointerId> {
        let reg = PointerRegistry::<()>::new();
        let handle = reg.handle();
        (0..n).map(|_| handle.add(Point::ZERO)).collect()
    }
}
