// Copyright 2025 the Tactile Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Threshold-buffered accumulation of continuous transform deltas.
//!
//! Continuous multi-pointer gestures must not report motion for every pixel
//! of sensor noise, but they also must not lose the motion that happened
//! while they were making up their mind. [`TransformAccumulator`] implements
//! the two-stage policy both needs share:
//!
//! 1. While uncommitted, each frame's raw translation/rotation/scale deltas
//!    are folded into buffers instead of being reported, and independent
//!    pixel-space motion buffers (translation magnitude, perpendicular
//!    displacement for rotation, inter-point distance change for scale)
//!    accumulate purely to detect intent.
//! 2. Once any squared motion buffer exceeds the squared pixel threshold,
//!    the accumulator commits: the buffered totals are returned as the first
//!    reported delta, and every later frame's raw delta passes through
//!    unchanged.
//!
//! The free functions in this module provide the canonical two-point math:
//! rotation is the signed angle between the old and new chord vectors, scale
//! is the ratio of new to old inter-point distance, and the rotation motion
//! metric is the perpendicular offset of each point from the line through
//! the previous chord (translation shifts both points the same way and
//! cancels out of it, so the metric stays quiet when the pair only pans,
//! and stays finite when the points are nearly collinear with the motion).
//!
//! ```rust
//! use kurbo::Vec2;
//! use tactile_gesture::{Deltas, TransformAccumulator};
//!
//! let mut acc = TransformAccumulator::new(10.0);
//!
//! // 6 px of motion: buffered, nothing reported.
//! let step = Deltas {
//!     translation: Vec2::new(6.0, 0.0),
//!     ..Deltas::IDENTITY
//! };
//! assert!(acc.feed(step, 0.0, 0.0).is_none());
//!
//! // 6 more px cross the 10 px threshold: the full 12 px come out at once.
//! let first = acc.feed(step, 0.0, 0.0).unwrap();
//! assert_eq!(first.translation, Vec2::new(12.0, 0.0));
//! assert!(acc.is_committed());
//! ```

use kurbo::{Point, Vec2};

/// Lengths below this are treated as degenerate (coincident points).
const DEGENERATE_LENGTH: f64 = 1e-9;

/// One frame's worth of continuous transform deltas.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Deltas {
    /// Translation in screen pixels.
    pub translation: Vec2,
    /// Rotation in degrees, counterclockwise positive.
    pub rotation: f64,
    /// Multiplicative scale factor.
    pub scale: f64,
}

impl Deltas {
    /// The no-motion delta.
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        rotation: 0.0,
        scale: 1.0,
    };

    /// Returns `true` if this delta carries no motion at all.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.translation == Vec2::ZERO && self.rotation == 0.0 && self.scale == 1.0
    }
}

impl Default for Deltas {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Buffers transform deltas until accumulated motion crosses a threshold.
#[derive(Clone, Debug)]
pub struct TransformAccumulator {
    threshold_sq: f64,
    committed: bool,
    buffered: Deltas,
    rotation_px: f64,
    scale_px: f64,
}

impl TransformAccumulator {
    /// Creates an accumulator with a motion threshold in screen pixels.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold_sq: threshold * threshold,
            committed: false,
            buffered: Deltas::IDENTITY,
            rotation_px: 0.0,
            scale_px: 0.0,
        }
    }

    /// Returns `true` once buffered motion has crossed the threshold.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Feeds one frame of raw deltas plus the frame's pixel-space motion
    /// metrics for rotation and scale.
    ///
    /// Returns `None` while still buffering. On the frame the threshold is
    /// crossed, returns the buffered totals; afterwards returns `raw`
    /// unchanged.
    pub fn feed(&mut self, raw: Deltas, rotation_px: f64, scale_px: f64) -> Option<Deltas> {
        if self.committed {
            return Some(raw);
        }
        self.buffered.translation += raw.translation;
        self.buffered.rotation += raw.rotation;
        self.buffered.scale *= raw.scale;
        self.rotation_px += rotation_px;
        self.scale_px += scale_px;

        let crossed = self.buffered.translation.hypot2() >= self.threshold_sq
            || self.rotation_px * self.rotation_px >= self.threshold_sq
            || self.scale_px * self.scale_px >= self.threshold_sq;
        if crossed {
            self.committed = true;
            Some(self.buffered)
        } else {
            None
        }
    }

    /// Clears buffers and the committed flag for the next epoch.
    pub fn reset(&mut self) {
        self.committed = false;
        self.buffered = Deltas::IDENTITY;
        self.rotation_px = 0.0;
        self.scale_px = 0.0;
    }
}

/// Signed angle, in degrees, between the old chord `prev1→prev2` and the new
/// chord `cur1→cur2`. Counterclockwise positive; zero for degenerate chords.
#[must_use]
pub fn chord_rotation(prev1: Point, prev2: Point, cur1: Point, cur2: Point) -> f64 {
    let old = prev2 - prev1;
    let new = cur2 - cur1;
    if old.hypot() < DEGENERATE_LENGTH || new.hypot() < DEGENERATE_LENGTH {
        return 0.0;
    }
    old.cross(new).atan2(old.dot(new)).to_degrees()
}

/// Ratio of the new inter-point distance to the old one; `1.0` when the old
/// pair was degenerate.
#[must_use]
pub fn distance_scale(prev1: Point, prev2: Point, cur1: Point, cur2: Point) -> f64 {
    let old = (prev2 - prev1).hypot();
    if old < DEGENERATE_LENGTH {
        return 1.0;
    }
    (cur2 - cur1).hypot() / old
}

/// Rotational motion metric in pixels: the perpendicular offsets of the new
/// positions from the line through the previous chord, with opposite
/// orientation so a common (translation) offset cancels.
#[must_use]
pub fn perpendicular_displacement(prev1: Point, prev2: Point, cur1: Point, cur2: Point) -> f64 {
    let chord = prev2 - prev1;
    let len = chord.hypot();
    if len < DEGENERATE_LENGTH {
        return 0.0;
    }
    let d1 = (cur1 - prev1).cross(chord) / len;
    let d2 = (cur2 - prev2).cross(chord) / len;
    (d1 - d2) / 2.0
}
