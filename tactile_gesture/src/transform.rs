// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The continuous transform recognizer: pan, rotate, scale, or any
//! combination of the three.
//!
//! One pointer produces translation only; two pointers additionally produce
//! rotation (signed angle between the old and new chord through both
//! pointers) and scale (inter-point distance ratio). Pointers beyond the
//! second are tracked for the count thresholds but do not enter the math.
//!
//! Nothing is reported until accumulated motion crosses the pixel threshold
//! (see [`TransformAccumulator`]); the first reported delta is the buffered
//! total, so no motion is lost to the buffering stage. The recognizer
//! requests `Began` on the commit frame and `Changed` for every moving frame
//! after it.

use kurbo::Vec2;

use crate::accumulator::{
    Deltas, TransformAccumulator, chord_rotation, distance_scale, perpendicular_displacement,
};
use crate::recognizer::{Recognizer, RecognizerCx};
use crate::state::GestureState;

/// Default motion threshold in screen pixels.
const DEFAULT_THRESHOLD: f64 = 20.0;

bitflags::bitflags! {
    /// Which transform channels a [`Transform`] recognizer reports.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct TransformMask: u8 {
        /// Report translation deltas.
        const TRANSLATION = 0b0000_0001;
        /// Report rotation deltas (needs two pointers).
        const ROTATION    = 0b0000_0010;
        /// Report scale deltas (needs two pointers).
        const SCALING     = 0b0000_0100;
    }
}

/// Recognizes continuous one- and two-pointer transforms.
#[derive(Debug)]
pub struct Transform {
    mask: TransformMask,
    accumulator: TransformAccumulator,
    deltas: Deltas,
}

impl Transform {
    /// Creates a recognizer reporting the given channels with the default
    /// motion threshold.
    #[must_use]
    pub fn new(mask: TransformMask) -> Self {
        Self::with_threshold(mask, DEFAULT_THRESHOLD)
    }

    /// Creates a recognizer with an explicit motion threshold in pixels.
    #[must_use]
    pub fn with_threshold(mask: TransformMask, threshold: f64) -> Self {
        Self {
            mask,
            accumulator: TransformAccumulator::new(threshold),
            deltas: Deltas::IDENTITY,
        }
    }

    /// All three channels.
    #[must_use]
    pub fn full() -> Self {
        Self::new(TransformMask::all())
    }

    /// Translation only.
    #[must_use]
    pub fn pan() -> Self {
        Self::new(TransformMask::TRANSLATION)
    }

    /// Rotation only.
    #[must_use]
    pub fn rotation() -> Self {
        Self::new(TransformMask::ROTATION)
    }

    /// Scale only.
    #[must_use]
    pub fn scaling() -> Self {
        Self::new(TransformMask::SCALING)
    }

    /// The channels this recognizer reports.
    #[must_use]
    pub fn mask(&self) -> TransformMask {
        self.mask
    }

    /// Translation delta of the most recent `Began`/`Changed` frame.
    #[must_use]
    pub fn translation_delta(&self) -> Vec2 {
        self.deltas.translation
    }

    /// Rotation delta, in degrees, of the most recent `Began`/`Changed`
    /// frame.
    #[must_use]
    pub fn rotation_delta(&self) -> f64 {
        self.deltas.rotation
    }

    /// Scale delta, as a multiplicative factor, of the most recent
    /// `Began`/`Changed` frame.
    #[must_use]
    pub fn scale_delta(&self) -> f64 {
        self.deltas.scale
    }

    /// Raw per-frame deltas and pixel motion metrics for the current pointer
    /// configuration, or `None` when positions are unavailable.
    fn frame_motion(&self, cx: &RecognizerCx<'_>) -> Option<(Deltas, f64, f64)> {
        let active = cx.core.active_pointers();
        let first = *active.first()?;
        let prev1 = cx.pointers.previous_position(first)?;
        let cur1 = cx.pointers.position(first)?;

        let two_point = self
            .mask
            .intersects(TransformMask::ROTATION | TransformMask::SCALING);
        if two_point && active.len() >= 2 {
            let second = active[1];
            let prev2 = cx.pointers.previous_position(second)?;
            let cur2 = cx.pointers.position(second)?;

            let translation = if self.mask.contains(TransformMask::TRANSLATION) {
                cur1.midpoint(cur2) - prev1.midpoint(prev2)
            } else {
                Vec2::ZERO
            };
            let (rotation, rotation_px) = if self.mask.contains(TransformMask::ROTATION) {
                (
                    chord_rotation(prev1, prev2, cur1, cur2),
                    perpendicular_displacement(prev1, prev2, cur1, cur2),
                )
            } else {
                (0.0, 0.0)
            };
            let (scale, scale_px) = if self.mask.contains(TransformMask::SCALING) {
                (
                    distance_scale(prev1, prev2, cur1, cur2),
                    (cur2 - cur1).hypot() - (prev2 - prev1).hypot(),
                )
            } else {
                (1.0, 0.0)
            };
            Some((
                Deltas {
                    translation,
                    rotation,
                    scale,
                },
                rotation_px,
                scale_px,
            ))
        } else if self.mask.contains(TransformMask::TRANSLATION) {
            Some((
                Deltas {
                    translation: cur1 - prev1,
                    ..Deltas::IDENTITY
                },
                0.0,
                0.0,
            ))
        } else {
            None
        }
    }
}

impl Recognizer for Transform {
    fn pointers_pressed(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        // Gaining pointers past a configured maximum terminates early rather
        // than accepting the extras.
        if cx.core.pointer_count_state().passed_max() {
            if cx.core.state().is_recognizing() {
                Some(GestureState::Ended)
            } else {
                Some(GestureState::Failed)
            }
        } else {
            None
        }
    }

    fn pointers_updated(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        if !cx.core.pointers_in_range() {
            return None;
        }
        let (raw, rotation_px, scale_px) = self.frame_motion(&cx)?;
        let reported = self.accumulator.feed(raw, rotation_px, scale_px)?;
        self.deltas = reported;
        if cx.core.state().is_recognizing() {
            Some(GestureState::Changed)
        } else {
            Some(GestureState::Began)
        }
    }

    fn pointers_released(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        if cx.core.pointer_count_state().passed_min() && cx.core.state().is_recognizing() {
            return Some(GestureState::Ended);
        }
        if cx.core.active_pointers().is_empty() && !cx.core.state().is_recognizing() {
            return Some(GestureState::Failed);
        }
        None
    }

    fn pointers_cancelled(&mut self, cx: RecognizerCx<'_>) -> Option<GestureState> {
        if cx.core.pointer_count_state().passed_min() && cx.core.state().is_recognizing() {
            return Some(GestureState::Cancelled);
        }
        if cx.core.active_pointers().is_empty() && !cx.core.state().is_recognizing() {
            return Some(GestureState::Failed);
        }
        None
    }

    fn reset(&mut self) {
        self.accumulator.reset();
        self.deltas = Deltas::IDENTITY;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
